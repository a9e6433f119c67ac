//! Streaming HTTP transport.
//!
//! Clients open `GET /sse`, receive an `endpoint` event naming their message
//! URL, and post JSON-RPC messages there. Responses come back as `message`
//! events on the stream. `POST /mcp` offers plain request/response.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{IncomingMessage, JsonRpcError, JsonRpcResponse, RequestId};
use crate::server::McpServer;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const SESSION_BUFFER: usize = 32;

type SessionSender = mpsc::Sender<JsonRpcResponse>;

/// Open SSE sessions keyed by session id.
#[derive(Clone, Default)]
struct Sessions(Arc<RwLock<HashMap<String, SessionSender>>>);

impl Sessions {
    fn insert(&self, id: String, sender: SessionSender) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
    }

    fn get(&self, id: &str) -> Option<SessionSender> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &str) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Removes the session when its stream is dropped.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        tracing::debug!(session = %self.id, "SSE session closed");
    }
}

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    sessions: Sessions,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>, shutdown: CancellationToken) -> Self {
        Self {
            server,
            sessions: Sessions::default(),
            shutdown,
            tasks: TaskTracker::new(),
        }
    }

    /// Number of open SSE sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Build the HTTP routes.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .route("/mcp", post(mcp_handler))
        .with_state(state)
}

/// HTTP transport bound to a `host:port` address.
pub struct HttpTransport {
    address: String,
}

impl HttpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Bind the listener and serve until cancellation.
    pub async fn run(self, server: Arc<McpServer>, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.address.as_str()).await.map_err(|e| {
            Error::Transport(format!("failed to bind {}: {}", self.address, e))
        })?;

        Self::serve(listener, server, shutdown).await
    }

    /// Serve on an already bound listener until cancellation.
    ///
    /// After the listener stops, dispatches started by `POST /message` are
    /// awaited.
    pub async fn serve(
        listener: TcpListener,
        server: Arc<McpServer>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        Self::serve_state(listener, HttpState::new(server, shutdown)).await
    }

    async fn serve_state(listener: TcpListener, state: HttpState) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!("Serving MCP over HTTP on http://{}", local_addr);

        let shutdown = state.shutdown.clone();
        let tasks = state.tasks.clone();

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        tasks.close();
        tasks.wait().await;

        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn sse_handler(
    State(state): State<HttpState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (sender, mut receiver) = mpsc::channel::<JsonRpcResponse>(SESSION_BUFFER);
    state.sessions.insert(session_id.clone(), sender);
    tracing::info!(session = %session_id, "SSE session opened");

    let endpoint = format!("/message?sessionId={}", session_id);
    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };
    let shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                response = receiver.recv() => response,
            };
            let Some(response) = next else { break };

            match serde_json::to_string(&response) {
                Ok(json) => {
                    yield Ok(Event::default().event("message").data(json));
                }
                Err(e) => tracing::error!("Failed to encode response: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

fn parse_error_response(e: serde_json::Error) -> Response {
    let body = JsonRpcResponse::error(RequestId::Null, JsonRpcError::parse_error(&e.to_string()));
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn message_handler(
    State(state): State<HttpState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(sender) = state.sessions.get(&query.session_id) else {
        tracing::warn!(session = %query.session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let message = match IncomingMessage::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Failed to parse message: {}", e);
            return parse_error_response(e);
        }
    };

    let server = state.server.clone();
    state.tasks.spawn(async move {
        if let Some(response) = server.handle_message(message).await {
            if sender.send(response).await.is_err() {
                tracing::debug!("Session closed before response was delivered");
            }
        }
    });

    StatusCode::ACCEPTED.into_response()
}

async fn mcp_handler(State(state): State<HttpState>, body: String) -> Response {
    let message = match IncomingMessage::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Failed to parse message: {}", e);
            return parse_error_response(e);
        }
    };

    match state.server.handle_message(message).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
