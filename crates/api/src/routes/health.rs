//! Health check handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use telemetry::{health, HealthReport};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub queue_depth: usize,
}

/// GET /health - full component report.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_depth = state.store.queue_depth().await.unwrap_or(0);
    Json(HealthResponse {
        report: health().report(),
        queue_depth,
    })
}

/// GET /health/ready - can the service accept traffic.
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - is the process running.
pub async fn live_handler() -> StatusCode {
    StatusCode::OK
}
