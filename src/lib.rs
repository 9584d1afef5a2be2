//! Read-only MCP server for MongoDB.
//!
//! Exposes query, aggregation, counting, plan inspection and schema inference
//! over a single configured database. Every request is structurally validated
//! and bounded before it reaches the server.
//!
//! # Example
//!
//! ```no_run
//! use mongo_readonly_mcp::{
//!     config::{DatabaseConfigBuilder, ServerConfig},
//!     protocol::McpServerBuilder,
//!     server::{McpHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let database = DatabaseConfigBuilder::new()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()?;
//!     let config = ServerConfig::builder().database(database).build();
//!
//!     // The connection opens on the first tool call.
//!     let state = Arc::new(ServerStateBuilder::new().config(config).build()?);
//!
//!     let server = McpServerBuilder::new()
//!         .handler(McpHandler::new(state))
//!         .build()?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod security;
pub mod server;
pub mod tools;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, LimitsConfig, ServerConfig};
pub use database::{ConnectionManager, ConnectionMetadata, DocumentStore, MongoStore};
pub use error::{McpError, Result};
pub use protocol::{McpServer, McpServerBuilder};
pub use schema::{InferredSchema, SchemaInferencer};
pub use security::{LimitPolicy, QueryValidator};
pub use server::{McpHandler, ServerState, ServerStateBuilder};
