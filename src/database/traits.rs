//! Document store trait.

use crate::error::DbResult;
use async_trait::async_trait;
use mongodb::bson::Document;
use serde::Deserialize;
use std::time::Duration;

/// Async document store.
///
/// Every method receives the execution ceiling, which implementations must
/// forward to the server. Implementations: [`MongoStore`](crate::database::MongoStore).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the store name (e.g., "mongodb").
    fn name(&self) -> &'static str;

    /// Name of the database all operations run against.
    fn database(&self) -> &str;

    /// Runs a bounded `find`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::QueryFailed`](crate::error::DatabaseError::QueryFailed)
    /// if the server rejects the query.
    async fn find(&self, collection: &str, request: FindRequest) -> DbResult<Vec<Document>>;

    /// Runs an aggregation pipeline. The caller is responsible for bounding it.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Duration,
    ) -> DbResult<Vec<Document>>;

    /// Counts documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document, max_time: Duration) -> DbResult<u64>;

    /// Lists every collection name in the database, unfiltered.
    async fn list_collection_names(&self) -> DbResult<Vec<String>>;

    /// Asks the server for its execution plan without returning documents.
    async fn explain(
        &self,
        collection: &str,
        target: ExplainTarget,
        verbosity: ExplainVerbosity,
        max_time: Duration,
    ) -> DbResult<Document>;

    /// Randomly samples up to `size` documents.
    async fn sample(&self, collection: &str, size: u32, max_time: Duration)
    -> DbResult<Vec<Document>>;
}

/// A bounded `find` request. `limit` is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub limit: u32,
    pub max_time: Duration,
}

impl FindRequest {
    pub fn new(filter: Document, limit: u32, max_time: Duration) -> Self {
        Self {
            filter,
            sort: None,
            projection: None,
            limit,
            max_time,
        }
    }

    pub fn with_sort(mut self, sort: Option<Document>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_projection(mut self, projection: Option<Document>) -> Self {
        self.projection = projection;
        self
    }
}

/// Operation whose plan is requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplainTarget {
    Find { filter: Document },
    Aggregate { pipeline: Vec<Document> },
}

impl ExplainTarget {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Find { .. } => "find",
            Self::Aggregate { .. } => "aggregate",
        }
    }
}

/// Explain verbosity accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplainVerbosity {
    #[default]
    QueryPlanner,
    ExecutionStats,
    AllPlansExecution,
}

impl ExplainVerbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryPlanner => "queryPlanner",
            Self::ExecutionStats => "executionStats",
            Self::AllPlansExecution => "allPlansExecution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_find_request_builder() {
        let request = FindRequest::new(doc! { "a": 1 }, 10, Duration::from_secs(30))
            .with_sort(Some(doc! { "a": -1 }))
            .with_projection(None);

        assert_eq!(request.limit, 10);
        assert_eq!(request.sort, Some(doc! { "a": -1 }));
        assert!(request.projection.is_none());
        assert_eq!(request.max_time, Duration::from_secs(30));
    }

    #[test]
    fn test_explain_verbosity_parsing() {
        let v: ExplainVerbosity = serde_json::from_value(serde_json::json!("executionStats")).unwrap();
        assert_eq!(v, ExplainVerbosity::ExecutionStats);
        assert_eq!(ExplainVerbosity::default().as_str(), "queryPlanner");
    }
}
