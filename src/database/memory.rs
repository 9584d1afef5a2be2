//! In-memory store for tests. Records every outgoing call.

use crate::database::traits::{DocumentStore, ExplainTarget, ExplainVerbosity, FindRequest};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Find(String, FindRequest),
    Aggregate(String, Vec<Document>, Duration),
    Count(String, Document, Duration),
    ListCollections,
    Explain(String, ExplainTarget, ExplainVerbosity, Duration),
    Sample(String, u32, Duration),
}

pub struct MemoryStore {
    database: String,
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    calls: Mutex<Vec<RecordedCall>>,
    failure: Mutex<Option<DatabaseError>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn with_collection(self, name: &str, documents: Vec<Document>) -> Self {
        self.collections.lock().insert(name.to_string(), documents);
        self
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DatabaseError) {
        *self.failure.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: RecordedCall) -> DbResult<()> {
        self.calls.lock().push(call);
        match self.failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Top-level equality only.
    fn matches(document: &Document, filter: &Document) -> bool {
        filter
            .iter()
            .all(|(key, value)| document.get(key) == Some(value))
    }
}

fn last_limit(pipeline: &[Document]) -> Option<usize> {
    pipeline.iter().rev().find_map(|stage| match stage.get("$limit") {
        Some(Bson::Int32(n)) => Some(*n as usize),
        Some(Bson::Int64(n)) => Some(*n as usize),
        _ => None,
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn find(&self, collection: &str, request: FindRequest) -> DbResult<Vec<Document>> {
        self.record(RecordedCall::Find(collection.to_string(), request.clone()))?;
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|d| Self::matches(d, &request.filter))
            .take(request.limit as usize)
            .collect())
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Duration,
    ) -> DbResult<Vec<Document>> {
        let limit = last_limit(&pipeline).unwrap_or(usize::MAX);
        self.record(RecordedCall::Aggregate(collection.to_string(), pipeline, max_time))?;
        Ok(self.documents(collection).into_iter().take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: Document, max_time: Duration) -> DbResult<u64> {
        let count = self
            .documents(collection)
            .iter()
            .filter(|d| Self::matches(d, &filter))
            .count() as u64;
        self.record(RecordedCall::Count(collection.to_string(), filter, max_time))?;
        Ok(count)
    }

    async fn list_collection_names(&self) -> DbResult<Vec<String>> {
        self.record(RecordedCall::ListCollections)?;
        Ok(self.collections.lock().keys().cloned().collect())
    }

    async fn explain(
        &self,
        collection: &str,
        target: ExplainTarget,
        verbosity: ExplainVerbosity,
        max_time: Duration,
    ) -> DbResult<Document> {
        let operation = target.operation();
        self.record(RecordedCall::Explain(
            collection.to_string(),
            target,
            verbosity,
            max_time,
        ))?;
        Ok(doc! {
            "queryPlanner": {
                "namespace": format!("{}.{}", self.database, collection),
                "winningPlan": { "stage": "COLLSCAN", "operation": operation },
            },
            "ok": 1.0,
        })
    }

    async fn sample(
        &self,
        collection: &str,
        size: u32,
        max_time: Duration,
    ) -> DbResult<Vec<Document>> {
        self.record(RecordedCall::Sample(collection.to_string(), size, max_time))?;
        Ok(self
            .documents(collection)
            .into_iter()
            .take(size as usize)
            .collect())
    }
}
