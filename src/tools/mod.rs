//! MCP tool definitions and registry.

pub mod args;
pub mod connection;
pub mod explain;
pub mod query;
pub mod registry;
pub mod schema;

pub use connection::ConnectionInfoTool;
pub use explain::ExplainTool;
pub use query::{AggregateTool, CountTool, FindTool};
pub use registry::{ToolHandler, ToolRegistry, envelope, format_count};
pub use schema::{InferSchemaTool, ListCollectionsTool};

use crate::database::ConnectionManager;
use crate::security::{LimitPolicy, QueryValidator};
use std::sync::Arc;

/// Create and register all tools.
pub fn create_registry(
    connection_manager: Arc<ConnectionManager>,
    validator: QueryValidator,
    limits: LimitPolicy,
) -> ToolRegistry {
    let registry = ToolRegistry::new();

    // Read tools (validated and bounded)
    registry.register(FindTool::new(
        Arc::clone(&connection_manager),
        validator,
        limits,
    ));
    registry.register(AggregateTool::new(
        Arc::clone(&connection_manager),
        validator,
        limits,
    ));
    registry.register(CountTool::new(
        Arc::clone(&connection_manager),
        validator,
        limits,
    ));
    registry.register(ExplainTool::new(
        Arc::clone(&connection_manager),
        validator,
        limits,
    ));

    // Schema tools
    registry.register(ListCollectionsTool::new(Arc::clone(&connection_manager)));
    registry.register(InferSchemaTool::new(Arc::clone(&connection_manager), limits));

    registry.register(ConnectionInfoTool::new(connection_manager, limits));

    registry
}
