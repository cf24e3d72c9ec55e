//! Factorio MCP Server
//!
//! Bridges an MCP client on stdio to a Factorio server's RCON console.
//! Connection settings come from the environment:
//! - FACTORIO_RCON_HOST, FACTORIO_RCON_PORT, FACTORIO_RCON_PASSWORD (required)
//! - FACTORIO_RCON_TIMEOUT_MS, MCP_SERVER_NAME, LOG_LEVEL (optional)

use anyhow::{Context, Result};
use factorio_mcp_server::{FactorioMcpServer, ServerConfig};
use factorio_rcon::RconClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    // stdout carries the protocol, so logs go to stderr
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid LOG_LEVEL {:?}", config.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Connects on the first tool call
    let client = Arc::new(RconClient::new(config.rcon));
    let server = FactorioMcpServer::new(client.clone(), config.server_name);

    info!(
        "{} v{} starting, RCON target {}",
        server.info().name,
        server.info().version,
        client.config().address()
    );

    tokio::select! {
        result = server.run_stdio() => result?,
        Ok(()) = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    client.disconnect().await;
    info!("Factorio MCP server stopped");

    Ok(())
}
