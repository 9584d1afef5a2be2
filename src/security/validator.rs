//! Structural query validator.
//!
//! Scans filters and aggregation pipelines for server-side scripting operators,
//! write stages and nested `$lookup` pipelines. The scan is read-only and stops
//! at the first forbidden key in document order.

use crate::database::value::Node;
use crate::error::{SecurityError, SecurityResult};
use mongodb::bson::{Bson, Document};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Filter operators that evaluate JavaScript on the server.
pub static FORBIDDEN_OPERATORS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["$where", "$function", "$accumulator"].into_iter().collect());

/// Pipeline stages that write data or evaluate JavaScript.
pub static FORBIDDEN_STAGES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["$out", "$merge", "$where", "$function"].into_iter().collect());

const LOOKUP_STAGE: &str = "$lookup";
const LOOKUP_PIPELINE_KEY: &str = "pipeline";

/// Depth-first scan of `node` for any key in `denylist`.
///
/// Every key of a mapping is checked before its value is descended into, and
/// sequences are scanned in order, so the first hit in document order wins.
pub fn scan(node: Node<'_>, denylist: &HashSet<&'static str>) -> Option<String> {
    match node {
        Node::Mapping(doc) => doc.iter().find_map(|(key, value)| {
            if denylist.contains(key.as_str()) {
                Some(key.clone())
            } else {
                scan(Node::of(value), denylist)
            }
        }),
        Node::Sequence(items) => items
            .iter()
            .find_map(|item| scan(Node::of(item), denylist)),
        Node::Scalar(_) => None,
    }
}

/// True if any `$lookup` in `node` carries a sub-pipeline, including lookups
/// inside `$facet` or `$unionWith` sub-pipelines.
fn has_lookup_pipeline(node: Node<'_>) -> bool {
    match node {
        Node::Mapping(doc) => doc.iter().any(|(key, value)| {
            let is_join = key == LOOKUP_STAGE
                && matches!(value, Bson::Document(body) if body.contains_key(LOOKUP_PIPELINE_KEY));
            is_join || has_lookup_pipeline(Node::of(value))
        }),
        Node::Sequence(items) => items.iter().any(|item| has_lookup_pipeline(Node::of(item))),
        Node::Scalar(_) => false,
    }
}

/// Read-only query validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryValidator;

impl QueryValidator {
    pub fn new() -> Self {
        Self
    }

    /// Reject filters containing scripting operators at any depth.
    pub fn validate_filter(&self, filter: &Document) -> SecurityResult<()> {
        if let Some(key) = scan(Node::Mapping(filter), &FORBIDDEN_OPERATORS) {
            warn!(operator = %key, "Forbidden filter operator rejected");
            return Err(SecurityError::ForbiddenOperator(key));
        }
        debug!("Filter validation passed");
        Ok(())
    }

    /// Reject projections carrying scripting operators; find projections accept
    /// aggregation expressions.
    pub fn validate_projection(&self, projection: &Document) -> SecurityResult<()> {
        if let Some(key) = scan(Node::Mapping(projection), &FORBIDDEN_OPERATORS) {
            warn!(operator = %key, "Forbidden projection operator rejected");
            return Err(SecurityError::ForbiddenOperator(key));
        }
        Ok(())
    }

    /// Validate every stage of a pipeline.
    ///
    /// Write stages are only meaningful at the top level, so they are checked
    /// against stage keys alone; scripting operators are searched recursively.
    pub fn validate_pipeline(&self, pipeline: &[Document]) -> SecurityResult<()> {
        for (index, stage) in pipeline.iter().enumerate() {
            self.validate_stage(stage).inspect_err(|e| {
                warn!(stage = index, key = e.offending_key(), "Pipeline stage rejected");
            })?;
        }
        debug!(stages = pipeline.len(), "Pipeline validation passed");
        Ok(())
    }

    fn validate_stage(&self, stage: &Document) -> SecurityResult<()> {
        if let Some(key) = stage
            .keys()
            .find(|key| FORBIDDEN_STAGES.contains(key.as_str()))
        {
            return Err(SecurityError::ForbiddenStage(key.clone()));
        }

        if has_lookup_pipeline(Node::Mapping(stage)) {
            return Err(SecurityError::NestedLookupPipeline);
        }

        if let Some(key) = scan(Node::Mapping(stage), &FORBIDDEN_OPERATORS) {
            return Err(SecurityError::ForbiddenOperator(key));
        }

        Ok(())
    }
}
