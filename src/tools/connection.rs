//! Tool: connection_info

use crate::config::LimitsConfig;
use crate::database::{ConnectionManager, ConnectionMetadata};
use crate::error::Result;
use crate::protocol::{CallToolResult, Tool};
use crate::security::LimitPolicy;
use crate::tools::registry::{ToolHandler, envelope};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct ConnectionReport<'a> {
    #[serde(flatten)]
    connection: ConnectionMetadata,
    limits: &'a LimitsConfig,
}

/// Reports connection state and effective limits. Never touches the database.
pub struct ConnectionInfoTool {
    connection_manager: Arc<ConnectionManager>,
    limits: LimitPolicy,
}

impl ConnectionInfoTool {
    pub fn new(connection_manager: Arc<ConnectionManager>, limits: LimitPolicy) -> Self {
        Self {
            connection_manager,
            limits,
        }
    }
}

#[async_trait]
impl ToolHandler for ConnectionInfoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "connection_info".into(),
            description: Some(
                "Get the configured database, connection state and query limits.".into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "connection_info"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let connection = self.connection_manager.metadata();
        let status = if connection.connected {
            "Connected".to_string()
        } else {
            "Not connected yet; the connection opens on the first query".to_string()
        };

        let report = ConnectionReport {
            connection,
            limits: self.limits.limits(),
        };
        let data = serde_json::to_string_pretty(&report)?;
        Ok(envelope(status, Some(data)))
    }
}
