//! Application Error Types
//!
//! Centralized error handling with Axum integration.
//!
//! Realtime handlers report every failure to the originating session only, as an
//! `error { message }` event; the HTTP admission path maps the same taxonomy to
//! status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quoted message not found in this room")]
    InvalidQuote,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message sent to the originating session as an `error` event.
    ///
    /// Storage and internal details are logged, never leaked to clients.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                "Storage failure, operation aborted".into()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal error".into()
            }
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::AccessDenied(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::InvalidQuote => (StatusCode::BAD_REQUEST, 10008, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}
