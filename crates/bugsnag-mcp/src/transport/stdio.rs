//! Newline-delimited JSON-RPC over stdin/stdout.

use std::io::{self, BufRead};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::protocol::JsonRpcResponse;
use crate::server::McpServer;

/// Lines buffered between the reader and the serve loop.
const LINE_BUFFER: usize = 64;

type LineReceiver = mpsc::Receiver<io::Result<String>>;

/// Transport for reading/writing JSON-RPC messages line by line.
///
/// Input lines arrive over a channel fed by a separate reader, so waiting
/// for input never pins the runtime.
pub struct StdioTransport {
    lines: LineReceiver,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    ///
    /// Stdin is read on a detached OS thread. A read blocked on an open but
    /// idle stdin does not hold up process exit.
    pub fn stdio() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || read_stdin(tx))?;

        Ok(Self {
            lines: rx,
            writer: Box::new(tokio::io::stdout()),
        })
    }

    /// Create a transport with custom reader/writer.
    ///
    /// Must be called within a tokio runtime; the reader is drained by a
    /// spawned task.
    pub fn new(
        reader: Box<dyn AsyncBufRead + Send + Unpin>,
        writer: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                let next = lines.next_line().await.transpose();
                let Some(line) = next else { break };
                let failed = line.is_err();
                if tx.send(line).await.is_err() || failed {
                    break;
                }
            }
        });

        Self { lines: rx, writer }
    }

    /// Read the next non-blank line. `None` on EOF.
    pub async fn read_message(&mut self) -> io::Result<Option<String>> {
        while let Some(line) = self.lines.recv().await {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                tracing::debug!("Received: {}", trimmed);
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }

    /// Write a JSON-RPC response followed by a newline.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Serve requests until EOF or cancellation.
    ///
    /// Cancellation is only observed while waiting for input, so a request
    /// that is already being handled always gets its response.
    pub async fn run(mut self, server: Arc<McpServer>, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Serving MCP over stdio");

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, closing stdio transport");
                    break;
                }
                line = self.read_message() => line?,
            };

            let Some(line) = line else {
                tracing::info!("EOF received, shutting down");
                break;
            };

            if let Some(response) = server.handle_raw(&line).await {
                self.write_response(&response).await?;
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }
}

/// Blocking stdin pump. Stops on EOF, a read error, or a dropped receiver.
fn read_stdin(tx: mpsc::Sender<io::Result<String>>) {
    for line in io::stdin().lock().lines() {
        let failed = line.is_err();
        if tx.blocking_send(line).is_err() || failed {
            return;
        }
    }
}
