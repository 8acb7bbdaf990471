//! dbmcp server entry point.
//!
//! Starts the MCP server on the configured transport: stdio (default,
//! for desktop MCP clients) or HTTP. Configuration comes from `DBMCP_*`
//! environment variables; a taken HTTP port exits with code 2.

use anyhow::Result;
use dbmcp::constants::{DEFAULT_HTTP_HOST, DEFAULT_HTTP_PORT, PROTOCOL_VERSION};
use dbmcp::transport::{self, StartupError, TransportType};
use dbmcp::{DatabaseService, McpRouter, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; stdout is reserved for JSON-RPC.
    init_logging();

    let transport: TransportType = std::env::var("DBMCP_TRANSPORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();

    let version = env!("CARGO_PKG_VERSION");
    eprintln!("dbmcp v{version} starting...");
    eprintln!("Protocol: MCP {PROTOCOL_VERSION}");
    eprintln!("Transport: {transport}");

    let config = Arc::new(ServerConfig::from_env()?);
    eprintln!(
        "Database: {} ({})",
        config.redacted_url(),
        config.database_type()
    );

    let service = Arc::new(DatabaseService::connect(config.clone()).await?);
    let router = McpRouter::new(service, config);
    eprintln!("Server initialized. Ready to accept requests...");

    match transport {
        TransportType::Stdio => {
            transport::stdio::serve(router.clone()).await?;
        }
        TransportType::Http => {
            let host =
                std::env::var("DBMCP_HTTP_HOST").unwrap_or_else(|_| DEFAULT_HTTP_HOST.to_string());
            let port = std::env::var("DBMCP_HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT);

            let listener = match transport::http::bind(&host, port).await {
                Ok(listener) => listener,
                Err(StartupError::AddrInUse { addr }) => {
                    eprintln!("Error: address already in use: {addr}");
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            };

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                eprintln!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            });

            transport::http::serve(listener, router.clone(), shutdown_rx).await?;
        }
    }

    eprintln!("Shutting down...");
    router.shutdown().await;
    eprintln!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing subscriber with stderr output.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,dbmcp=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
