//! MCP server binary entry point.

use anyhow::Result;
use mongo_readonly_mcp::{
    config::{DatabaseConfigBuilder, ServerConfig},
    protocol::McpServerBuilder,
    server::{McpHandler, ServerStateBuilder},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let database = DatabaseConfigBuilder::new().from_env()?.build()?;
    if database.require_uri().is_err() || database.require_database().is_err() {
        warn!("MONGODB_URI or MONGODB_DATABASE is not set; tool calls will fail until configured");
    }
    let config = ServerConfig::builder().database(database).build();

    let state = Arc::new(ServerStateBuilder::new().config(config).build()?);
    info!("Server state initialized with {} tools", state.tools.len());

    let server = McpServerBuilder::new()
        .handler(McpHandler::new(state))
        .name(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .build()?;

    info!("MCP server ready, waiting for requests...");
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mongo_readonly_mcp=info,warn"));

    // stdout carries the protocol, so logs go to stderr.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
