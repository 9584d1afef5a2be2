//! Schema inspection tools: list_collections, infer_schema.

use crate::database::ConnectionManager;
use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::schema::SchemaInferencer;
use crate::security::LimitPolicy;
use crate::tools::args::parse_args;
use crate::tools::registry::{ToolHandler, envelope};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PREFIX: &str = "system.";

pub struct ListCollectionsTool {
    connection_manager: Arc<ConnectionManager>,
}

impl ListCollectionsTool {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }
}

#[async_trait]
impl ToolHandler for ListCollectionsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_collections".into(),
            description: Some(
                "List collections in the configured database. System collections are omitted."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "list_collections"))]
    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        let store = self.connection_manager.get_store().await?;
        let mut names: Vec<String> = store
            .list_collection_names()
            .await
            .map_err(McpError::from)?
            .into_iter()
            .filter(|name| !name.starts_with(SYSTEM_PREFIX))
            .collect();
        names.sort();

        if names.is_empty() {
            return Ok(CallToolResult::text(format!(
                "No collections found in database '{}'",
                store.database()
            )));
        }

        let mut text = format!(
            "Collections in database '{}' ({}):",
            store.database(),
            names.len()
        );
        for name in &names {
            text.push_str("\n- ");
            text.push_str(name);
        }
        Ok(CallToolResult::text(text))
    }
}

#[derive(Debug, Deserialize)]
pub struct InferSchemaArgs {
    pub collection: String,
    #[serde(default)]
    pub sample_size: Option<i64>,
}

pub struct InferSchemaTool {
    connection_manager: Arc<ConnectionManager>,
    limits: LimitPolicy,
}

impl InferSchemaTool {
    pub fn new(connection_manager: Arc<ConnectionManager>, limits: LimitPolicy) -> Self {
        Self {
            connection_manager,
            limits,
        }
    }
}

#[async_trait]
impl ToolHandler for InferSchemaTool {
    fn definition(&self) -> Tool {
        let limits = self.limits.limits();
        Tool {
            name: "infer_schema".into(),
            description: Some(
                "Infer a collection's field structure from a random sample of documents. \
                Reports the value kinds seen per field and how often the field is present."
                    .into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {
                        "type": "string",
                        "description": "Collection to sample"
                    },
                    "sample_size": {
                        "type": "integer",
                        "description": format!("Documents to sample (default {}, max {})", limits.default_sample_size, limits.max_sample_size)
                    }
                },
                "required": ["collection"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "infer_schema"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: InferSchemaArgs = parse_args(arguments)?;
        let size = self.limits.sample_size(args.sample_size);

        let store = self.connection_manager.get_store().await?;
        let documents = store
            .sample(&args.collection, size, self.limits.max_time())
            .await
            .map_err(McpError::from)?;

        if documents.is_empty() {
            return Ok(CallToolResult::text(format!(
                "Collection '{}' is empty or does not exist",
                args.collection
            )));
        }

        let schema = SchemaInferencer::infer(&documents);
        debug!(
            sampled = schema.sample_size,
            fields = schema.fields.len(),
            "Schema inferred"
        );

        let status = format!(
            "Schema for collection '{}' (sampled {} documents, {} fields):",
            args.collection,
            schema.sample_size,
            schema.fields.len()
        );
        Ok(envelope(status, Some(schema.render())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::DocumentStore;
    use crate::database::memory::{MemoryStore, RecordedCall};
    use mongodb::bson::doc;
    use serde_json::json;
    use std::time::Duration;

    fn manager(store: &Arc<MemoryStore>) -> Arc<ConnectionManager> {
        let shared: Arc<dyn DocumentStore> = store.clone();
        Arc::new(ConnectionManager::with_store(DatabaseConfig::default(), shared))
    }

    #[tokio::test]
    async fn test_list_collections_hides_system_and_sorts() {
        let store = Arc::new(
            MemoryStore::new("shop")
                .with_collection("users", vec![])
                .with_collection("system.views", vec![])
                .with_collection("orders", vec![]),
        );
        let result = ListCollectionsTool::new(manager(&store))
            .execute(json!({}))
            .await
            .unwrap();

        assert_eq!(
            result.texts(),
            vec!["Collections in database 'shop' (2):\n- orders\n- users"]
        );
        assert_eq!(store.calls(), vec![RecordedCall::ListCollections]);
    }

    #[tokio::test]
    async fn test_list_collections_empty() {
        let store = Arc::new(MemoryStore::new("shop").with_collection("system.profile", vec![]));
        let result = ListCollectionsTool::new(manager(&store))
            .execute(Value::Null)
            .await
            .unwrap();

        assert_eq!(result.texts(), vec!["No collections found in database 'shop'"]);
    }

    #[tokio::test]
    async fn test_infer_schema_mixed_kinds() {
        let store = Arc::new(MemoryStore::new("shop").with_collection(
            "people",
            vec![doc! { "age": 30 }, doc! { "age": "thirty" }],
        ));
        let result = InferSchemaTool::new(manager(&store), LimitPolicy::default())
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap();

        assert_eq!(
            result.texts(),
            vec![
                "Schema for collection 'people' (sampled 2 documents, 1 fields):",
                "age: Int | String (100%)",
            ]
        );
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Sample(
                "people".into(),
                100,
                Duration::from_millis(30_000)
            )]
        );
    }

    #[tokio::test]
    async fn test_infer_schema_clamps_sample_size() {
        let store = Arc::new(MemoryStore::new("shop").with_collection("people", vec![doc! { "a": 1 }]));
        InferSchemaTool::new(manager(&store), LimitPolicy::default())
            .execute(json!({ "collection": "people", "sample_size": 50_000 }))
            .await
            .unwrap();

        assert!(matches!(
            &store.calls()[0],
            RecordedCall::Sample(_, 1000, _)
        ));
    }

    #[tokio::test]
    async fn test_infer_schema_empty_collection() {
        let store = Arc::new(MemoryStore::new("shop"));
        let result = InferSchemaTool::new(manager(&store), LimitPolicy::default())
            .execute(json!({ "collection": "ghost" }))
            .await
            .unwrap();

        assert_eq!(
            result.texts(),
            vec!["Collection 'ghost' is empty or does not exist"]
        );
    }
}
