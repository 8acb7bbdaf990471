//! HTTP transport: a single MCP endpoint plus a health probe.
//!
//! - `POST /mcp`: one JSON-RPC request per body; 200 with the response,
//!   204 for notifications, 500 with a JSON body on parse failure.
//! - `OPTIONS /mcp`: CORS preflight.
//! - other methods on `/mcp`: 405 with a JSON body.
//! - `GET /health`: server and database status.
//!
//! Handlers run concurrently on the shared runtime; the router they call
//! is safe for that.

use crate::constants::{HTTP_SHUTDOWN_GRACE, SERVER_NAME};
use crate::error::ServerError;
use crate::protocol::McpRouter;
use crate::transport::StartupError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{json, Value};
use std::future::IntoFuture;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
];

/// Build the axum application serving the MCP endpoint.
pub fn app(router: McpRouter) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route(
            "/mcp",
            post(mcp_post).options(mcp_options).fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

/// Bind the listener, translating a taken port into a typed startup
/// error the operator CLI maps to exit code 2.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            StartupError::AddrInUse { addr }
        } else {
            StartupError::Other(ServerError::connection(format!(
                "Failed to bind {addr}: {e}"
            )))
        }
    })
}

/// Serve until the shutdown signal fires, then drain in-flight requests
/// for at most the grace period. Idempotent with respect to repeated
/// signals.
pub async fn serve(
    listener: TcpListener,
    router: McpRouter,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), StartupError> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP transport listening on http://{addr}");
        info!("MCP endpoint: http://{addr}/mcp");
        info!("Health endpoint: http://{addr}/health");
    }

    let drain_signal = {
        let mut rx = shutdown.clone();
        async move {
            let _ = rx.wait_for(|fired| *fired).await;
            info!("HTTP transport draining");
        }
    };

    let server = axum::serve(listener, app(router))
        .with_graceful_shutdown(drain_signal)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| StartupError::Other(ServerError::connection(e.to_string())))?;
        }
        _ = async {
            let _ = shutdown.wait_for(|fired| *fired).await;
            tokio::time::sleep(HTTP_SHUTDOWN_GRACE).await;
        } => {
            warn!("grace period elapsed; dropping remaining connections");
        }
    }

    Ok(())
}

/// `GET /health`: status, server identity, timestamp, lifecycle state,
/// and a database probe obtained by briefly leasing a connection.
async fn health(State(router): State<McpRouter>) -> impl IntoResponse {
    let database = match router.service().probe().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {e}"),
    };

    Json(json!({
        "status": "healthy",
        "server": SERVER_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "state": router.state().name(),
        "database": database,
    }))
}

/// `POST /mcp`: route one JSON-RPC message.
async fn mcp_post(State(router): State<McpRouter>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "unparseable HTTP request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                CORS_HEADERS,
                Json(json!({ "error": format!("Internal server error: {e}") })),
            )
                .into_response();
        }
    };

    match router.handle(message).await {
        Some(response) => (StatusCode::OK, CORS_HEADERS, Json(response)).into_response(),
        None => (StatusCode::NO_CONTENT, CORS_HEADERS).into_response(),
    }
}

/// `OPTIONS /mcp`: CORS preflight.
async fn mcp_options() -> impl IntoResponse {
    (StatusCode::OK, CORS_HEADERS)
}

/// Any other method on `/mcp`.
async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        CORS_HEADERS,
        Json(json!({ "error": "Method not allowed. Use POST." })),
    )
}
