//! Transport bindings for the MCP server.
//!
//! Exactly one transport runs for the lifetime of the process. Both stop when
//! the shutdown token is cancelled.

mod http;
mod stdio;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use http::{router, HttpState, HttpTransport};
pub use stdio::StdioTransport;

use crate::error::Result;
use crate::server::McpServer;

/// Default listen address for the HTTP transport.
pub const DEFAULT_HTTP_ADDRESS: &str = "localhost:8080";

/// Transport selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Streaming HTTP on the given `host:port`
    Http { address: String },
}

impl TransportMode {
    /// Run the transport until EOF (stdio) or cancellation.
    pub async fn serve(self, server: Arc<McpServer>, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(transport = %self, "Starting transport");

        match self {
            TransportMode::Stdio => StdioTransport::stdio()?.run(server, shutdown).await,
            TransportMode::Http { address } => {
                HttpTransport::new(address).run(server, shutdown).await
            }
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stdio => write!(f, "stdio"),
            TransportMode::Http { address } => write!(f, "http ({})", address),
        }
    }
}
