//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ChatlineError;

/// Errors returned before a stream starts.
///
/// Once the SSE response is open, failures travel as an `error` event instead.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or empty request.
    Validation(String),
    /// Anything the caller cannot fix.
    Internal(String),
}

impl From<ChatlineError> for AppError {
    fn from(e: ChatlineError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}
