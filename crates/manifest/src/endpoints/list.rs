//! # GET /manifests

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use pluto_types::{ListParams, ManifestMeta};

use crate::config::ManifestState;
use crate::endpoints::requester_locale;
use crate::error::ManifestError;

pub async fn handle_list(
    State(state): State<Arc<ManifestState>>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ManifestMeta>>, ManifestError> {
    let Query(params) = params.map_err(|e| ManifestError::Validation(e.body_text()))?;
    let locale = requester_locale(&state, &headers);
    let metas = state.pipeline.list(&params, &locale).await?;
    Ok(Json(metas))
}
