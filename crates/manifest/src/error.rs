//! # Manifest service error type
//!
//! | Variant | Status | `code` |
//! |---------|--------|--------|
//! | `Validation` | 400 | `validation_error` |
//! | `Canonicalization` | 400 | `canonicalization_error` |
//! | `NotFound` | 404 | `not_found` |
//! | `Internal` | 500 | `internal_error` |
//! | `Timeout` | 504 | `timeout` |
//!
//! A canonicalization failure is a client error unless the serializer itself
//! failed, which is `Internal`.
//!
//! Response messages are fixed per variant; the detail is only logged.

use axum::http::StatusCode;
use axum::Json;
use pluto_core::CanonicalizationError;
use pluto_types::ErrorResponse;

use crate::pipeline::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("canonicalization error: {0}")]
    Canonicalization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("request timed out")]
    Timeout,
}

impl From<PipelineError> for ManifestError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Validation(detail) => ManifestError::Validation(detail),
            PipelineError::Canonicalization(e @ CanonicalizationError::Encode(_)) => {
                ManifestError::Internal(e.to_string())
            }
            PipelineError::Canonicalization(e) => ManifestError::Canonicalization(e.to_string()),
            PipelineError::NotFound(id) => ManifestError::NotFound(id.to_string()),
            PipelineError::Store(e) => ManifestError::Internal(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ManifestError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            ManifestError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "request is invalid",
            ),
            ManifestError::Canonicalization(_) => (
                StatusCode::BAD_REQUEST,
                "canonicalization_error",
                "manifest content cannot be canonicalized",
            ),
            ManifestError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found", "manifest not found")
            }
            ManifestError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error",
            ),
            ManifestError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                "request timed out",
            ),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "manifest request failed");
        } else {
            tracing::warn!(error = %self, "manifest request rejected");
        }
        let body = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;
    use crate::storage::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ManifestError, StatusCode)> = vec![
            (
                PipelineError::Validation("no en".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Canonicalization(CanonicalizationError::Malformed("x".into()))
                    .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Canonicalization(CanonicalizationError::MissingIdentity {
                    collection: "actions".into(),
                    index: 0,
                    field: "id",
                })
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Canonicalization(CanonicalizationError::Encode("io".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::NotFound(uuid::Uuid::nil()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                PipelineError::Store(StoreError::Backend("disk full".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ManifestError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
