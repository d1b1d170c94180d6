use admission::RateLimitError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use transform::TransformError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Publisher exceeded its per-key request budget
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// A websocket connection was refused by admission control
    #[error("Connection rejected: {0}")]
    ConnectionRejected(#[from] RateLimitError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded | ServerError::ConnectionRejected(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ServerError::BadRequest(_) | ServerError::Transform(TransformError::Topic(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Transform(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::ConnectionRejected(_) => "CONNECTION_REJECTED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Transform(TransformError::Topic(_)) => "INVALID_TOPIC",
            ServerError::Transform(_) => "TRANSFORM_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::ConnectionRejected(err) => Some(json!({
                "limit": err.limit.as_str(),
                "current": err.current,
                "max": err.max,
            })),
            ServerError::Transform(err) => Some(json!({
                "error_type": transform::classify_error(err).as_str(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
