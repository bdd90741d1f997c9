//! Streamable-HTTP transport.
//!
//! `POST {mcp_path}` carries one JSON-RPC message per request and answers
//! with a JSON body. `GET /health` answers with the health envelope.
//! `initialize` without a session header opens a session and returns its
//! id in `mcp-session-id`.

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use super::{McpService, RequestOrigin};
use crate::envelope::SuccessEnvelope;
use crate::types::{ClientId, SessionId};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const HEALTH_PATH: &str = "/health";

/// HTTP server wrapping an [`McpService`].
#[derive(Debug)]
pub struct HttpServer {
    service: McpService,
    addr: SocketAddr,
    mcp_path: String,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(service: McpService, addr: SocketAddr, mcp_path: impl Into<String>) -> Self {
        Self {
            service,
            addr,
            mcp_path: mcp_path.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Bind and serve until [`shutdown`](Self::shutdown) is requested.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(
            "MCP HTTP server listening on http://{}{} (health: {})",
            local,
            self.mcp_path,
            HEALTH_PATH,
        );

        let app = router(self.service.clone(), &self.mcp_path);
        let cancel = self.cancel.clone();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("MCP HTTP server shutting down");
            })
            .await
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Build the routes. The MCP path answers with and without its trailing slash.
pub fn router(service: McpService, mcp_path: &str) -> Router {
    let path = if mcp_path.starts_with('/') {
        mcp_path.to_string()
    } else {
        format!("/{}", mcp_path)
    };

    let mut app = Router::new()
        .route(HEALTH_PATH, get(handle_health))
        .route(&path, post(handle_mcp));

    let trimmed = path.trim_end_matches('/');
    if !trimmed.is_empty() && trimmed != path {
        app = app.route(trimmed, post(handle_mcp));
    }
    app.with_state(service)
}

async fn handle_health(State(service): State<McpService>) -> Json<SuccessEnvelope> {
    Json(service.health())
}

async fn handle_mcp(
    State(service): State<McpService>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!("Rejected body from {}: {}", peer, err);
            return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::parse_error(&err)))
                .into_response();
        }
    };

    let mut origin = origin_from(peer, &headers);
    let opened = if request.method == "initialize" && origin.session_id.is_none() {
        let session = SessionId::new();
        origin.session_id = Some(session.clone());
        Some(session)
    } else {
        None
    };

    match service.handle(request, &origin).await {
        Some(reply) => {
            let mut response = Json(reply).into_response();
            if let Some(session) = opened {
                if let Ok(value) = HeaderValue::from_str(session.as_str()) {
                    response.headers_mut().insert(SESSION_HEADER, value);
                }
            }
            response
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn origin_from(peer: SocketAddr, headers: &HeaderMap) -> RequestOrigin {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| SessionId::from_string(v.trim().to_string()).ok());

    RequestOrigin {
        client_id: ClientId::from_string(peer.to_string()).ok(),
        session_id,
    }
}
