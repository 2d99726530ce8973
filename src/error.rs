//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Request-level error taxonomy.
///
/// Throttling is its own kind so callers can back off instead of treating it
/// as a permanent failure. Per-item ingest errors never surface here; a batch
/// call with failing items still returns 200 with per-item outcomes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("API credentials missing")]
    MissingCredentials,

    #[error("API credentials rejected")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("rate limit exceeded")]
    Throttled,

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "API key required".to_string())
            }
            AppError::InvalidCredentials => (StatusCode::FORBIDDEN, "Invalid API key".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Throttled => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded, back off and retry".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
