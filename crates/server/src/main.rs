//! visarag-mcp server entry point.
//!
//! Boots the visa data service and exposes it over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use visarag_client::{BackgroundOptimizer, VisaService};
use visarag_core::AppConfig;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let service = VisaService::from_config(&config).context("failed to build visa service")?;
    tracing::info!(?service, "Starting visarag-mcp server on stdio transport");

    let optimizer = BackgroundOptimizer::new(
        service.maintenance_targets(),
        config.optimizer_interval(),
        config.low_confidence_threshold,
    );
    let handler = handler::VisaRagServer::new(service, optimizer.clone());
    let maintenance = optimizer.start();

    let server = serve_server(handler, stdio()).await?;
    let quit = server.waiting().await;

    let cycles = maintenance.stop().await;
    tracing::info!(cycles, "visarag-mcp server stopped");
    quit?;

    Ok(())
}
