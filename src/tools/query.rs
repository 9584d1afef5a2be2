//! Read tools: find, aggregate, count.

use crate::database::{ConnectionManager, FindRequest, documents_to_json};
use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::security::{LimitPolicy, QueryValidator};
use crate::tools::args::{parse_args, parse_document, parse_pipeline};
use crate::tools::registry::{ToolHandler, envelope, format_count};
use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

const BOUNDING_STAGE: &str = "$limit";

#[derive(Debug, Deserialize)]
pub struct FindArgs {
    pub collection: String,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub sort: Option<Value>,
    #[serde(default)]
    pub projection: Option<Value>,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub struct FindTool {
    connection_manager: Arc<ConnectionManager>,
    validator: QueryValidator,
    limits: LimitPolicy,
}

impl FindTool {
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
}

#[async_trait]
impl ToolHandler for FindTool {
    fn definition(&self) -> Tool {
        let limits = self.limits.limits();
        Tool {
            name: "find".into(),
            description: Some(format!(
                "Query documents in a collection. Read-only: $where, $function and \
                $accumulator are rejected. Returns at most {} documents (default {}).",
                limits.max_limit, limits.default_limit
            )),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {
                        "type": "string",
                        "description": "Collection to query"
                    },
                    "filter": {
                        "type": "object",
                        "description": "Query filter (MongoDB Extended JSON)"
                    },
                    "sort": {
                        "type": "object",
                        "description": "Sort specification, e.g. {\"createdAt\": -1}"
                    },
                    "projection": {
                        "type": "object",
                        "description": "Fields to include or exclude"
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!("Maximum documents to return (default {}, max {})", limits.default_limit, limits.max_limit)
                    }
                },
                "required": ["collection"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "find"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: FindArgs = parse_args(arguments)?;

        let filter = parse_document(args.filter, "filter")?.unwrap_or_default();
        self.validator.validate_filter(&filter).map_err(McpError::from)?;

        let projection = parse_document(args.projection, "projection")?;
        if let Some(projection) = &projection {
            self.validator.validate_projection(projection)?;
        }

        let limit = self.limits.row_limit(args.limit);
        let request = FindRequest::new(filter, limit, self.limits.max_time())
            .with_sort(parse_document(args.sort, "sort")?)
            .with_projection(projection);

        let store = self.connection_manager.get_store().await?;
        let documents = store
            .find(&args.collection, request)
            .await
            .map_err(McpError::from)?;

        let mut status = format!(
            "Found {} documents in collection '{}'",
            documents.len(),
            args.collection
        );
        if documents.len() == limit as usize {
            status.push_str(&format!(" (limited to {})", limit));
        }

        let data = if documents.is_empty() {
            None
        } else {
            Some(documents_to_json(&documents)?)
        };
        Ok(envelope(status, data))
    }
}

#[derive(Debug, Deserialize)]
pub struct AggregateArgs {
    pub collection: String,
    pub pipeline: Value,
}

pub struct AggregateTool {
    connection_manager: Arc<ConnectionManager>,
    validator: QueryValidator,
    limits: LimitPolicy,
}

impl AggregateTool {
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

    /// Append a `$limit` stage unless the pipeline already has one.
    pub fn bound_pipeline(&self, mut pipeline: Vec<Document>) -> Vec<Document> {
        if !pipeline.iter().any(|stage| stage.contains_key(BOUNDING_STAGE)) {
            let cap = self.limits.pipeline_limit();
            debug!("Appending {{$limit: {}}} to pipeline", cap);
            pipeline.push(doc! { "$limit": i64::from(cap) });
        }
        pipeline
    }
}

#[async_trait]
impl ToolHandler for AggregateTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "aggregate".into(),
            description: Some(format!(
                "Run a read-only aggregation pipeline. $out, $merge, server-side \
                JavaScript and $lookup sub-pipelines are rejected. A {{\"$limit\": {}}} \
                stage is appended when the pipeline has none.",
                self.limits.pipeline_limit()
            )),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {
                        "type": "string",
                        "description": "Collection to aggregate"
                    },
                    "pipeline": {
                        "type": "array",
                        "items": { "type": "object" },
                        "description": "Aggregation stages (MongoDB Extended JSON)"
                    }
                },
                "required": ["collection", "pipeline"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "aggregate"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: AggregateArgs = parse_args(arguments)?;

        let pipeline = parse_pipeline(args.pipeline)?;
        self.validator
            .validate_pipeline(&pipeline)
            .map_err(McpError::from)?;
        let pipeline = self.bound_pipeline(pipeline);

        let store = self.connection_manager.get_store().await?;
        let documents = store
            .aggregate(&args.collection, pipeline, self.limits.max_time())
            .await
            .map_err(McpError::from)?;

        let status = format!(
            "Aggregation returned {} documents from collection '{}'",
            documents.len(),
            args.collection
        );
        let data = if documents.is_empty() {
            None
        } else {
            Some(documents_to_json(&documents)?)
        };
        Ok(envelope(status, data))
    }
}

#[derive(Debug, Deserialize)]
pub struct CountArgs {
    pub collection: String,
    #[serde(default)]
    pub filter: Option<Value>,
}

pub struct CountTool {
    connection_manager: Arc<ConnectionManager>,
    validator: QueryValidator,
    limits: LimitPolicy,
}

impl CountTool {
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
}

#[async_trait]
impl ToolHandler for CountTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "count".into(),
            description: Some(
                "Count documents in a collection, optionally matching a filter.".into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {
                        "type": "string",
                        "description": "Collection to count"
                    },
                    "filter": {
                        "type": "object",
                        "description": "Query filter (MongoDB Extended JSON)"
                    }
                },
                "required": ["collection"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "count"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: CountArgs = parse_args(arguments)?;

        let filter = parse_document(args.filter, "filter")?.unwrap_or_default();
        self.validator.validate_filter(&filter).map_err(McpError::from)?;
        let filtered = !filter.is_empty();

        let store = self.connection_manager.get_store().await?;
        let count = store
            .count(&args.collection, filter, self.limits.max_time())
            .await
            .map_err(McpError::from)?;

        let mut status = format!(
            "Collection '{}' contains {} documents",
            args.collection,
            format_count(count)
        );
        if filtered {
            status.push_str(" matching the filter");
        }
        Ok(CallToolResult::text(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::DocumentStore;
    use crate::database::memory::{MemoryStore, RecordedCall};
    use crate::error::{DatabaseError, SecurityError};
    use serde_json::json;
    use std::time::Duration;

    fn people(n: i32) -> Vec<Document> {
        (0..n)
            .map(|i| {
                let team = if i % 2 == 0 { "red" } else { "blue" };
                doc! { "i": i, "team": team }
            })
            .collect()
    }

    fn setup(docs: Vec<Document>) -> (Arc<MemoryStore>, Arc<ConnectionManager>) {
        let store = Arc::new(MemoryStore::new("shop").with_collection("people", docs));
        let shared: Arc<dyn DocumentStore> = store.clone();
        let manager = Arc::new(ConnectionManager::with_store(DatabaseConfig::default(), shared));
        (store, manager)
    }

    fn find_tool(manager: Arc<ConnectionManager>) -> FindTool {
        FindTool::new(manager, QueryValidator::new(), LimitPolicy::default())
    }

    #[tokio::test]
    async fn test_find_default_limit_and_suffix() {
        let (store, manager) = setup(people(25));
        let result = find_tool(manager)
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap();

        let texts = result.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(
            texts[0],
            "Found 10 documents in collection 'people' (limited to 10)"
        );

        let calls = store.calls();
        let RecordedCall::Find(collection, request) = &calls[0] else {
            panic!("expected find");
        };
        assert_eq!(collection, "people");
        assert_eq!(request.limit, 10);
        assert_eq!(request.max_time, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_find_below_limit_has_no_suffix() {
        let (_, manager) = setup(people(3));
        let result = find_tool(manager)
            .execute(json!({ "collection": "people", "filter": { "team": "red" }, "limit": 50 }))
            .await
            .unwrap();

        assert_eq!(result.texts()[0], "Found 2 documents in collection 'people'");
    }

    #[tokio::test]
    async fn test_find_clamps_requested_limit() {
        let (store, manager) = setup(people(1));
        find_tool(manager)
            .execute(json!({ "collection": "people", "limit": 5000 }))
            .await
            .unwrap();

        let calls = store.calls();
        let RecordedCall::Find(_, request) = &calls[0] else {
            panic!("expected find");
        };
        assert_eq!(request.limit, 100);
    }

    #[tokio::test]
    async fn test_find_empty_result_has_only_status() {
        let (_, manager) = setup(vec![]);
        let result = find_tool(manager)
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap();
        assert_eq!(result.texts(), vec!["Found 0 documents in collection 'people'"]);
    }

    #[tokio::test]
    async fn test_find_rejected_filter_never_reaches_store() {
        let (store, manager) = setup(people(3));
        let err = find_tool(manager)
            .execute(json!({
                "collection": "people",
                "filter": { "$or": [ { "a": 1 }, { "$where": "sleep(1000)" } ] }
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            McpError::Security(SecurityError::ForbiddenOperator(ref key)) if key == "$where"
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_find_rejects_scripting_projection() {
        let (store, manager) = setup(people(3));
        let err = find_tool(manager)
            .execute(json!({
                "collection": "people",
                "projection": {
                    "x": { "$function": { "body": "function() { while (true) {} }", "args": [], "lang": "js" } }
                }
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            McpError::Security(SecurityError::ForbiddenOperator(ref key)) if key == "$function"
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_find_passes_plain_projection() {
        let (store, manager) = setup(people(3));
        find_tool(manager)
            .execute(json!({ "collection": "people", "projection": { "team": 1, "_id": 0 } }))
            .await
            .unwrap();

        let calls = store.calls();
        let RecordedCall::Find(_, request) = &calls[0] else {
            panic!("expected find");
        };
        assert_eq!(request.projection, Some(doc! { "team": 1, "_id": 0 }));
    }

    #[tokio::test]
    async fn test_find_upstream_failure_propagates() {
        let (store, manager) = setup(people(3));
        store.fail_next(DatabaseError::Timeout(30_000));

        let err = find_tool(manager)
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Database(DatabaseError::Timeout(30_000))));
    }

    #[tokio::test]
    async fn test_find_serializes_int64_exactly() {
        let (_, manager) = setup(vec![doc! { "big": 9_007_199_254_740_993_i64 }]);
        let result = find_tool(manager)
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap();
        assert!(result.texts()[1].contains("9007199254740993"));
    }

    fn aggregate_tool(manager: Arc<ConnectionManager>) -> AggregateTool {
        AggregateTool::new(manager, QueryValidator::new(), LimitPolicy::default())
    }

    #[tokio::test]
    async fn test_aggregate_appends_single_limit() {
        let (store, manager) = setup(people(3));
        let result = aggregate_tool(manager)
            .execute(json!({
                "collection": "people",
                "pipeline": [ { "$match": { "team": "red" } } ]
            }))
            .await
            .unwrap();
        assert!(result.texts()[0].starts_with("Aggregation returned 3 documents"));

        let calls = store.calls();
        let RecordedCall::Aggregate(_, pipeline, max_time) = &calls[0] else {
            panic!("expected aggregate");
        };
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline[1], doc! { "$limit": 100_i64 });
        assert_eq!(*max_time, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_aggregate_keeps_existing_limit() {
        let (store, manager) = setup(people(3));
        aggregate_tool(manager)
            .execute(json!({
                "collection": "people",
                "pipeline": [ { "$limit": 2 }, { "$project": { "i": 1 } } ]
            }))
            .await
            .unwrap();

        let calls = store.calls();
        let RecordedCall::Aggregate(_, pipeline, _) = &calls[0] else {
            panic!("expected aggregate");
        };
        assert_eq!(pipeline.len(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_rejects_write_stage() {
        let (store, manager) = setup(people(3));
        let err = aggregate_tool(manager)
            .execute(json!({
                "collection": "people",
                "pipeline": [ { "$match": {} }, { "$merge": { "into": "copy" } } ]
            }))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("$merge"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_rejects_lookup_pipeline() {
        let (store, manager) = setup(people(3));
        let err = aggregate_tool(manager)
            .execute(json!({
                "collection": "people",
                "pipeline": [ { "$lookup": { "from": "x", "pipeline": [], "as": "y" } } ]
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            McpError::Security(SecurityError::NestedLookupPipeline)
        ));
        assert!(store.calls().is_empty());
    }

    fn count_tool(manager: Arc<ConnectionManager>) -> CountTool {
        CountTool::new(manager, QueryValidator::new(), LimitPolicy::default())
    }

    #[tokio::test]
    async fn test_count_without_filter() {
        let (store, manager) = setup(people(1234));
        let result = count_tool(manager)
            .execute(json!({ "collection": "people" }))
            .await
            .unwrap();

        assert_eq!(
            result.texts(),
            vec!["Collection 'people' contains 1,234 documents"]
        );
        assert!(matches!(
            &store.calls()[0],
            RecordedCall::Count(_, _, max_time) if *max_time == Duration::from_millis(30_000)
        ));
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let (_, manager) = setup(people(4));
        let result = count_tool(manager)
            .execute(json!({ "collection": "people", "filter": { "team": "blue" } }))
            .await
            .unwrap();

        assert_eq!(
            result.texts(),
            vec!["Collection 'people' contains 2 documents matching the filter"]
        );
    }

    #[tokio::test]
    async fn test_count_rejects_function_operator() {
        let (store, manager) = setup(people(4));
        let result = count_tool(manager)
            .execute(json!({
                "collection": "people",
                "filter": { "$expr": { "$function": { "body": "return true", "args": [], "lang": "js" } } }
            }))
            .await;

        assert!(result.is_err());
        assert!(store.calls().is_empty());
    }
}
