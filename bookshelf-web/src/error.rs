//! Error types for bookshelf-web
//!
//! Every rejected request answers with
//! `{"status": "error", "code": ..., "message": ...}`; form validation
//! failures add an `errors` object keyed by field name.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use bookshelf_common::form::FieldErrors;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Form validation failed (400)
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflict (409)
    #[error("{0}")]
    Conflict(String),

    /// Upload larger than the accepted limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// A sink failed to store a book (500, carries `outcome`)
    #[error("Could not save the book: {0}")]
    Persistence(String),

    /// bookshelf-common error
    #[error(transparent)]
    Common(#[from] bookshelf_common::Error),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use bookshelf_common::Error as CommonError;

        let (status, code, message) = match self {
            ApiError::Validation(errors) => {
                let body = Json(json!({
                    "status": "error",
                    "code": "VALIDATION_ERROR",
                    "message": "Please correct the errors below.",
                    "errors": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            ApiError::Persistence(msg) => {
                let body = Json(json!({
                    "status": "error",
                    "code": "PERSISTENCE_ERROR",
                    "outcome": "persistence-error",
                    "level": "error",
                    "message": format!("Could not save the book: {}", msg),
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                CommonError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                other => {
                    tracing::error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        other.to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "status": "error",
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;
