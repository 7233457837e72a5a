//! Liveness route. Public; sits outside the auth middleware.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;

/// Liveness report.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` when the process is serving.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Attachment slots loaded into the catalog.
    pub slots: usize,
}

/// GET `/health`
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        slots: state.guard.catalog().slot_count(),
    })
}

/// Creates the health route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
