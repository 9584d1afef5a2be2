//! MCP request handler implementation.

use crate::error::ProtocolResult;
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, MCP_VERSION, ServerCapabilities, ToolsCapability,
};
use crate::server::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// MCP request handler that processes protocol messages.
pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn instructions(&self) -> String {
        let limits = &self.state.config.limits;
        let database = self
            .state
            .config
            .database
            .database
            .as_deref()
            .unwrap_or("(not configured)");
        format!(
            "Read-only MongoDB server for database '{}'. \
            Tools: find, aggregate, count, list_collections, explain, infer_schema, connection_info. \
            Results are capped at {} documents and every operation has a {}ms time limit. \
            $where, $function, $accumulator, $out and $merge are rejected.",
            database, limits.max_limit, limits.max_time_ms
        )
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{}",
            params.client_info.name, params.client_info.version
        );
        debug!("Client capabilities: {:?}", params.capabilities);

        self.state.set_initialized(params.client_info);

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: Implementation {
                name: self.state.config.name.to_string(),
                version: self.state.config.version.to_string(),
            },
            instructions: Some(self.instructions()),
        })
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.tools.list();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        let name = params.name.clone();
        debug!("Tool call: {}", name);

        match self.state.tools.execute(params).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_policy_violation() => {
                warn!(tool = %name, "Rejected: {}", e);
                Ok(CallToolResult::error(e.to_string()))
            }
            Err(e) => {
                error!(tool = %name, "Tool execution error: {}", e);
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}
