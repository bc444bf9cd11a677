//! HTTP front end.
//!
//! - `POST /api/v1/create`: multipart `file` (task text) and `storage_path`
//!   (destination); responds with the generation result
//! - `GET /health`

mod errors;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::pipeline::Orchestrator;

pub use errors::{ApiError, ProblemDetails};
pub use handlers::{AppState, FILE_FIELD, STORAGE_PATH_FIELD};

/// Builds the router for `orchestrator`.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/create", post(handlers::create))
        .with_state(AppState { orchestrator })
}

/// Serves the API on `listener` until the server stops.
pub async fn serve_on(listener: TcpListener, orchestrator: Arc<Orchestrator>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "Starting API");
    axum::serve(listener, router(orchestrator)).await
}

/// Binds `addr` and serves the API.
///
/// # Errors
///
/// Returns an error if the listener fails to bind or the server terminates
/// unexpectedly.
pub async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, orchestrator).await
}
