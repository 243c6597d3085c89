//! `chess-mcp-server` binary.

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use chess_mcp_server::McpHttpServer;
use chess_mcp_server::server::{DEFAULT_DATA_DIR, DEFAULT_PATH, DEFAULT_PORT};

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "chess-mcp-server", about = "Chess over MCP Streamable HTTP", version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "CHESS_MCP_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "CHESS_MCP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Endpoint path
    #[arg(long, env = "CHESS_MCP_PATH", default_value = DEFAULT_PATH)]
    path: String,

    /// Directory holding one saved game per session
    #[arg(long, env = "CHESS_MCP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Keep games in memory only
    #[arg(long, env = "CHESS_MCP_IN_MEMORY", conflicts_with = "data_dir")]
    in_memory: bool,

    /// Answer POST requests with JSON bodies instead of SSE streams
    #[arg(long, env = "CHESS_MCP_JSON_RESPONSE")]
    json_response: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chess_mcp_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = McpHttpServer::builder()
        .host(cli.host)
        .port(cli.port)
        .path(cli.path)
        .json_response(cli.json_response);
    builder = if cli.in_memory {
        builder.in_memory()
    } else {
        builder.data_dir(cli.data_dir)
    };

    let config = builder.build().context("invalid server configuration")?;
    let server = McpHttpServer::bind(config)
        .await
        .context("failed to start server")?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received");
        })
        .await
        .context("server failed")?;

    Ok(())
}
