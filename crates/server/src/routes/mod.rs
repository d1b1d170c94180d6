//! API route handlers
//!
//! - `health`: Liveness, readiness, Prometheus metrics and relay stats
//! - `ws`: Websocket subscriptions for project and job topics
//! - `publish`: Publisher entry point that transforms and fans out messages

pub mod health;
pub mod publish;
pub mod ws;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Progress Relay",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/ws/project/{project_id}",
            "/ws/job/{job_id}",
            "/api/v1/publish",
            "/api/v1/stats",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
