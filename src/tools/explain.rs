//! Query plan tool.

use crate::database::{ConnectionManager, ExplainTarget, ExplainVerbosity, to_relaxed_json};
use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::security::{LimitPolicy, QueryValidator};
use crate::tools::args::{parse_args, parse_document, parse_pipeline};
use crate::tools::registry::{ToolHandler, envelope};
use async_trait::async_trait;
use mongodb::bson::Bson;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainOperation {
    #[default]
    Find,
    Aggregate,
}

#[derive(Debug, Deserialize)]
pub struct ExplainArgs {
    pub collection: String,
    #[serde(default)]
    pub operation: ExplainOperation,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub pipeline: Option<Value>,
    #[serde(default)]
    pub verbosity: ExplainVerbosity,
}

pub struct ExplainTool {
    connection_manager: Arc<ConnectionManager>,
    validator: QueryValidator,
    limits: LimitPolicy,
}

impl ExplainTool {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        validator: QueryValidator,
        limits: LimitPolicy,
    ) -> Self {
        Self {
            connection_manager,
            validator,
            limits,
        }
    }

    /// Decode and validate the operation to explain.
    fn target(&self, args: &mut ExplainArgs) -> Result<ExplainTarget> {
        match args.operation {
            ExplainOperation::Find => {
                let filter = parse_document(args.filter.take(), "filter")?.unwrap_or_default();
                self.validator.validate_filter(&filter)?;
                Ok(ExplainTarget::Find { filter })
            }
            ExplainOperation::Aggregate => {
                let pipeline = match args.pipeline.take() {
                    Some(value) => parse_pipeline(value)?,
                    None => Vec::new(),
                };
                self.validator.validate_pipeline(&pipeline)?;
                Ok(ExplainTarget::Aggregate { pipeline })
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ExplainTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "explain".into(),
            description: Some(
                "Show the execution plan for a find or aggregate without returning documents. \
                The same operator and stage restrictions as find/aggregate apply."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {
                        "type": "string",
                        "description": "Collection the operation targets"
                    },
                    "operation": {
                        "type": "string",
                        "enum": ["find", "aggregate"],
                        "description": "Operation to explain (default: find)"
                    },
                    "filter": {
                        "type": "object",
                        "description": "Filter for a find"
                    },
                    "pipeline": {
                        "type": "array",
                        "items": { "type": "object" },
                        "description": "Stages for an aggregate"
                    },
                    "verbosity": {
                        "type": "string",
                        "enum": ["queryPlanner", "executionStats", "allPlansExecution"],
                        "description": "Explain verbosity (default: queryPlanner)"
                    }
                },
                "required": ["collection"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "explain"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let mut args: ExplainArgs = parse_args(arguments)?;
        let target = self.target(&mut args)?;
        let operation = target.operation();

        let store = self.connection_manager.get_store().await?;
        let plan = store
            .explain(&args.collection, target, args.verbosity, self.limits.max_time())
            .await
            .map_err(McpError::from)?;

        let status = format!(
            "Query plan for {} on collection '{}':",
            operation, args.collection
        );
        Ok(envelope(status, Some(to_relaxed_json(&Bson::Document(plan))?)))
    }
}
