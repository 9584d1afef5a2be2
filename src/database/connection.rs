//! Lazy, shared store initialization with `Arc<RwLock<Option<ConnectionState>>>`.

use crate::config::DatabaseConfig;
use crate::database::{DocumentStore, MongoStore};
use crate::error::{McpError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConnectionState {
    pub store: Arc<dyn DocumentStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetadata {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ConnectionMetadata {
    pub fn disconnected(database: Option<String>) -> Self {
        Self {
            connected: false,
            store: None,
            database,
        }
    }

    fn from_store(store: &dyn DocumentStore) -> Self {
        Self {
            connected: true,
            store: Some(store.name().to_string()),
            database: Some(store.database().to_string()),
        }
    }
}

/// Owns the single pooled store shared by every tool invocation.
///
/// The store is created on first use; missing connection settings surface as
/// a configuration error at that point rather than at startup.
pub struct ConnectionManager {
    config: DatabaseConfig,
    state: Arc<RwLock<Option<ConnectionState>>>,
}

impl ConnectionManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// Manager with an already-connected store.
    pub fn with_store(config: DatabaseConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(Some(ConnectionState { store }))),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        match &*self.state.read() {
            Some(state) => ConnectionMetadata::from_store(state.store.as_ref()),
            None => ConnectionMetadata::disconnected(self.config.database.clone()),
        }
    }

    fn current(&self) -> Option<Arc<dyn DocumentStore>> {
        self.state.read().as_ref().map(|s| Arc::clone(&s.store))
    }

    /// Returns the shared store, connecting on first call.
    pub async fn get_store(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(store) = self.current() {
            return Ok(store);
        }

        let uri = self.config.require_uri().map_err(McpError::from)?;
        let database = self.config.require_database().map_err(McpError::from)?;

        let store: Arc<dyn DocumentStore> =
            Arc::new(MongoStore::connect(uri, database, &self.config).await?);

        // Another invocation may have connected while we were awaiting.
        let mut guard = self.state.write();
        if let Some(existing) = guard.as_ref() {
            debug!("Store already initialized by a concurrent request");
            return Ok(Arc::clone(&existing.store));
        }
        *guard = Some(ConnectionState {
            store: Arc::clone(&store),
        });
        info!("Connected to database '{}'", database);

        Ok(store)
    }
}
