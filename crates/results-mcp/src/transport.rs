//! Stdio and HTTP transports.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::rpc::McpServer;

/// Serve newline delimited JSON-RPC on stdin/stdout until stdin closes or `cancel` fires.
pub async fn serve_stdio(server: McpServer, cancel: CancellationToken) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut lines = reader.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };
        let Some(line) = line else {
            debug!("Stdin closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let request_cancel = cancel.child_token();
        if let Some(reply) = server.handle_message(&line, &request_cancel).await {
            stdout
                .write_all((reply + "\n").as_bytes())
                .await
                .context("Failed to write to stdout")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

#[derive(Clone)]
struct AppState {
    server: McpServer,
    cancel: CancellationToken,
}

/// HTTP routes: `POST /mcp` and `GET /health`.
pub fn router(server: McpServer, cancel: CancellationToken) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { server, cancel })
}

/// Serve HTTP on `address` until `cancel` fires.
pub async fn serve_http(server: McpServer, address: SocketAddr, cancel: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "Tekton Results MCP server listening");

    let app = router(server, cancel.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server failed")
}

async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    let request_cancel = state.cancel.child_token();
    match state.server.handle_message(&body, &request_cancel).await {
        Some(reply) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
