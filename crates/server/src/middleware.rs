use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Request ID carried in request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Publisher API key authentication and per-key rate limiting
pub async fn api_key_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let api_key = request
        .headers()
        .get("x-api-key")
        .or_else(|| request.headers().get(AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).to_string());

    let Some(key) = api_key else {
        return Err(ServerError::Authentication(
            "API key required. Provide it in 'X-API-Key' or 'Authorization: Bearer <key>' header"
                .to_string(),
        ));
    };

    if !state.is_valid_api_key(&key) {
        return Err(ServerError::Authentication("Invalid API key".to_string()));
    }

    if !state.check_rate_limit(&key) {
        tracing::warn!("publisher_rate_limited");
        return Err(ServerError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}
