//! Read-only status API
//!
//! - `GET /health` - liveness
//! - `GET /status` - latest player status snapshot
//! - `GET /events` - SSE stream of queue events

pub mod sse;

use std::future::Future;
use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::json;
use songq_common::events::EventBus;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::player::PlayerStatus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub status: watch::Receiver<PlayerStatus>,
    pub bus: Arc<EventBus>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/events", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the status API until `shutdown` resolves
pub async fn serve<F>(bind_addr: &str, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Status API listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(e.to_string()))
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "songq-player",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Current player status
async fn get_status(State(state): State<AppState>) -> Json<PlayerStatus> {
    Json(state.status.borrow().clone())
}
