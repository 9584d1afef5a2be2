//! MongoDB store using the official `mongodb` driver.

use crate::config::DatabaseConfig;
use crate::database::traits::{DocumentStore, ExplainTarget, ExplainVerbosity, FindRequest};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// MongoDB-backed document store. Cloning shares the driver's connection pool.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
    name: String,
}

impl MongoStore {
    /// Build a pooled client for the configured connection target.
    pub async fn connect(uri: &str, database: &str, config: &DatabaseConfig) -> DbResult<Self> {
        info!("Connecting to MongoDB database '{}'", database);

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        options.app_name = Some(config.app_name.clone());
        options.max_pool_size = Some(config.pool_size);
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let client = Client::with_options(options)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "MongoDB client created with max pool size {}",
            config.pool_size
        );

        Ok(Self {
            database: client.database(database),
            name: database.to_string(),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

}

/// Driver options for a bounded `find`.
fn find_options(request: &FindRequest) -> FindOptions {
    let mut options = FindOptions::default();
    options.limit = Some(i64::from(request.limit));
    options.max_time = Some(request.max_time);
    options.sort = request.sort.clone();
    options.projection = request.projection.clone();
    options
}

/// `explain` command document. The time ceiling travels inside the explained command.
fn explain_command(
    collection: &str,
    target: ExplainTarget,
    verbosity: ExplainVerbosity,
    max_time: Duration,
) -> Document {
    let max_time_ms = max_time.as_millis() as i64;
    let explained = match target {
        ExplainTarget::Find { filter } => doc! {
            "find": collection,
            "filter": filter,
            "maxTimeMS": max_time_ms,
        },
        ExplainTarget::Aggregate { pipeline } => doc! {
            "aggregate": collection,
            "pipeline": pipeline,
            "cursor": {},
            "maxTimeMS": max_time_ms,
        },
    };
    doc! {
        "explain": explained,
        "verbosity": verbosity.as_str(),
    }
}

fn upstream(max_time: Duration) -> impl Fn(mongodb::error::Error) -> DatabaseError {
    move |e| DatabaseError::from_driver(e, max_time.as_millis() as u64)
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    fn database(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(limit = request.limit))]
    async fn find(&self, collection: &str, request: FindRequest) -> DbResult<Vec<Document>> {
        let options = find_options(&request);
        let coll = self.collection(collection);
        let cursor = coll
            .find(request.filter)
            .with_options(options)
            .await
            .map_err(upstream(request.max_time))?;
        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(upstream(request.max_time))?;
        debug!("find returned {} documents", documents.len());
        Ok(documents)
    }

    #[instrument(skip(self, pipeline), fields(stages = pipeline.len()))]
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Duration,
    ) -> DbResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline)
            .max_time(max_time)
            .await
            .map_err(upstream(max_time))?;
        cursor.try_collect().await.map_err(upstream(max_time))
    }

    #[instrument(skip(self, filter))]
    async fn count(&self, collection: &str, filter: Document, max_time: Duration) -> DbResult<u64> {
        self.collection(collection)
            .count_documents(filter)
            .max_time(max_time)
            .await
            .map_err(upstream(max_time))
    }

    async fn list_collection_names(&self) -> DbResult<Vec<String>> {
        self.database
            .list_collection_names()
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    #[instrument(skip(self, target), fields(operation = target.operation()))]
    async fn explain(
        &self,
        collection: &str,
        target: ExplainTarget,
        verbosity: ExplainVerbosity,
        max_time: Duration,
    ) -> DbResult<Document> {
        let command = explain_command(collection, target, verbosity, max_time);
        self.database
            .run_command(command)
            .await
            .map_err(upstream(max_time))
    }

    #[instrument(skip(self))]
    async fn sample(
        &self,
        collection: &str,
        size: u32,
        max_time: Duration,
    ) -> DbResult<Vec<Document>> {
        let pipeline = vec![doc! { "$sample": { "size": i64::from(size) } }];
        self.aggregate(collection, pipeline, max_time).await
    }
}
