//! POST /manifests handler

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use pluto_types::{ManifestCreate, ManifestCreateResponse};

use crate::config::ManifestState;
use crate::error::ManifestError;

pub async fn handle_create(
    State(state): State<Arc<ManifestState>>,
    body: Result<Json<ManifestCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ManifestCreateResponse>), ManifestError> {
    let Json(request) = body.map_err(|e| ManifestError::Validation(e.body_text()))?;

    let created = tokio::time::timeout(state.request_timeout, state.pipeline.create(request))
        .await
        .map_err(|_| ManifestError::Timeout)??;

    Ok((StatusCode::CREATED, Json(created)))
}
