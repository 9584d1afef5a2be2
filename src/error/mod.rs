//! Error types for the MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.
//! Three families are terminal for a request: [`SecurityError`] (policy violation),
//! [`DatabaseError`] (upstream failure) and [`ConfigError`] (missing configuration).

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Policy violation: {0}")]
    Security(#[from] SecurityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl McpError {
    /// True when the request was rejected by the query safety policy.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::Security(_))
    }
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
        }
    }
}

/// Failures reported by the database client.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Operation exceeded time limit of {0}ms")]
    Timeout(u64),
}

/// MongoDB server error code for `MaxTimeMSExpired`.
const MAX_TIME_MS_EXPIRED: i32 = 50;

impl DatabaseError {
    /// Map a driver error, recognising server-side time ceiling expiry.
    pub fn from_driver(err: mongodb::error::Error, max_time_ms: u64) -> Self {
        if let mongodb::error::ErrorKind::Command(ref command) = *err.kind
            && command.code == MAX_TIME_MS_EXPIRED
        {
            return Self::Timeout(max_time_ms);
        }
        Self::QueryFailed(err.to_string())
    }
}

/// Query policy violations. Always name the offending key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Forbidden operator '{0}' is not allowed in queries")]
    ForbiddenOperator(String),

    #[error("Forbidden pipeline stage '{0}' is not allowed")]
    ForbiddenStage(String),

    #[error("$lookup with a nested 'pipeline' is not allowed")]
    NestedLookupPipeline,
}

impl SecurityError {
    /// The key that triggered the violation.
    pub fn offending_key(&self) -> &str {
        match self {
            Self::ForbiddenOperator(key) | Self::ForbiddenStage(key) => key,
            Self::NestedLookupPipeline => "$lookup",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for SecurityError.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
