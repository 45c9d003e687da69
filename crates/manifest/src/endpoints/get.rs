//! # GET /manifests/{id}

use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use pluto_types::ManifestView;
use uuid::Uuid;

use crate::config::ManifestState;
use crate::endpoints::requester_locale;
use crate::error::ManifestError;

/// Full manifest, localized to the requester with per-field `en` fallback.
pub async fn handle_get(
    State(state): State<Arc<ManifestState>>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ManifestView>, ManifestError> {
    let Path(id) = id.map_err(|e| ManifestError::Validation(e.body_text()))?;
    let locale = requester_locale(&state, &headers);
    let view = state.pipeline.get(id, &locale).await?;
    Ok(Json(view))
}
