//! Limit policy: normalizes caller-requested bounds into a safe range.

use crate::config::LimitsConfig;
use std::time::Duration;
use tracing::debug;

/// Clamp a requested bound.
///
/// Absent or non-positive requests fall back to `default`; anything else is
/// capped at `max`. Never fails.
pub fn clamp(requested: Option<i64>, default: u32, max: u32) -> u32 {
    match requested {
        Some(r) if r > 0 => r.min(i64::from(max)) as u32,
        _ => default,
    }
}

/// Limit policy bound to a fixed [`LimitsConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitPolicy {
    limits: LimitsConfig,
}

impl LimitPolicy {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Effective row limit for `find`.
    pub fn row_limit(&self, requested: Option<i64>) -> u32 {
        let effective = clamp(requested, self.limits.default_limit, self.limits.max_limit);
        debug!(?requested, effective, "Row limit resolved");
        effective
    }

    /// Effective sample size for schema inference.
    pub fn sample_size(&self, requested: Option<i64>) -> u32 {
        let effective = clamp(
            requested,
            self.limits.default_sample_size,
            self.limits.max_sample_size,
        );
        debug!(?requested, effective, "Sample size resolved");
        effective
    }

    /// Cap appended to pipelines that carry no `$limit` of their own.
    pub fn pipeline_limit(&self) -> u32 {
        self.limits.max_limit
    }

    /// Execution ceiling attached to every database call. Not caller-adjustable.
    pub fn max_time(&self) -> Duration {
        self.limits.max_time()
    }
}
