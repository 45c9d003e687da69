//! # Auth service error type
//!
//! Responses carry only a generic `{code, message}` body. The detail is
//! logged here, once, when the error becomes a response.

use axum::http::StatusCode;
use axum::Json;
use pluto_types::ErrorResponse;

use crate::ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Request body could not be parsed
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Signing, storage or unresolved contention
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for AuthError {
    fn from(e: LedgerError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            AuthError::BadRequest(detail) => {
                tracing::warn!(detail = %detail, "rejected login request");
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "request body is invalid",
                )
            }
            AuthError::Internal(detail) => {
                tracing::error!(detail = %detail, "login failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        };
        let body = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
