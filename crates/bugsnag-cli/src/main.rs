//! bugsnag-mcp - MCP server exposing Bugsnag to AI assistants.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bugsnag_client::BugsnagClient;
use bugsnag_core::Config;
use bugsnag_mcp::transport::DEFAULT_HTTP_ADDRESS;
use bugsnag_mcp::{McpServer, ShutdownCoordinator, TransportMode};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser)]
#[command(name = "bugsnag-mcp")]
#[command(author, version, about = "MCP server for Bugsnag organizations, projects and events", long_about = None)]
struct Cli {
    /// Transport to serve on
    #[arg(short, long, value_enum, default_value_t = TransportKind::Stdio)]
    transport: TransportKind,

    /// Listen address for the HTTP transport
    #[arg(short, long, default_value = DEFAULT_HTTP_ADDRESS)]
    address: String,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Server-Sent Events over HTTP
    #[value(alias = "sse")]
    Http,
}

impl TransportKind {
    fn into_mode(self, address: String) -> TransportMode {
        match self {
            TransportKind::Stdio => TransportMode::Stdio,
            TransportKind::Http => TransportMode::Http { address },
        }
    }
}

/// Normalize the requested level; unknown values fall back to info.
fn log_level(requested: &str) -> Option<&'static str> {
    let requested = requested.trim().to_ascii_lowercase();
    LOG_LEVELS.iter().copied().find(|level| *level == requested)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr
    let level = log_level(&cli.log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LOG_LEVEL)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if level.is_none() {
        tracing::warn!(
            "Unknown log level '{}', using {}",
            cli.log_level,
            DEFAULT_LOG_LEVEL
        );
    }

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "Configuration resolved");

    let client = BugsnagClient::from_config(&config);
    let server = Arc::new(McpServer::new(Arc::new(client)));

    let shutdown = ShutdownCoordinator::new();
    let signals = shutdown
        .listen()
        .context("failed to install signal handlers")?;

    let mode = cli.transport.into_mode(cli.address);
    let result = mode.serve(server, shutdown.token()).await;
    signals.abort();

    if let Err(e) = &result {
        tracing::error!("Server error: {}", e);
    }
    result.context("server failed")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}
