use crate::error::{ServerError, ServerResult};
use crate::hub::HubStats;
use crate::state::{ServerMetadata, ServerState};
use admission::AdmissionStats;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;
use transform::MetricsSnapshot;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "relay-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let hub = state.hub.stats();

    Ok(Json(json!({
        "status": "ready",
        "service": "relay-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "admission": "ready",
            "transform": "ready",
            "hub": { "topics": hub.topics, "sessions": hub.sessions },
        }
    })))
}

/// Prometheus metrics endpoint
///
/// Falls back to the in-process transform snapshot as JSON when no
/// Prometheus recorder is installed.
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<Response> {
    if !state.config.metrics_enabled {
        return Err(ServerError::NotFound);
    }
    match &state.prometheus {
        Some(handle) => Ok((
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response()),
        None => Ok(Json(state.relay.metrics().snapshot()).into_response()),
    }
}

#[derive(Debug, Serialize)]
pub struct RelayStatsResponse {
    pub server: ServerMetadata,
    pub admission: AdmissionStats,
    pub transform: MetricsSnapshot,
    pub hub: HubStats,
}

/// Admission, transform and fan-out statistics (authenticated)
pub async fn relay_stats(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(RelayStatsResponse {
        server: ServerMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime_seconds(),
        },
        admission: state.relay.tracker().stats(),
        transform: state.relay.metrics().snapshot(),
        hub: state.hub.stats(),
    }))
}
