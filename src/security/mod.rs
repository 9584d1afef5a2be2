//! Query validation and bound normalization.

pub mod limits;
pub mod validator;

pub use limits::{LimitPolicy, clamp};
pub use validator::{FORBIDDEN_OPERATORS, FORBIDDEN_STAGES, QueryValidator, scan};
