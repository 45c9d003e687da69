//! # GET /manifests/{id}/verify
//!
//! Rebuilds the canonical payload from stored rows and checks the stored
//! signature against the service key.

use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Json;
use pluto_types::VerifyResponse;
use uuid::Uuid;

use crate::config::ManifestState;
use crate::error::ManifestError;

pub async fn handle_verify(
    State(state): State<Arc<ManifestState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VerifyResponse>, ManifestError> {
    let Path(id) = id.map_err(|e| ManifestError::Validation(e.body_text()))?;
    let result = state.pipeline.verify(id).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use pluto_types::ManifestCreate;

    use super::*;
    use crate::endpoints::test_helpers::{create_body, test_state};

    #[tokio::test]
    async fn test_fresh_manifest_verifies() {
        let (state, _) = test_state();
        let req: ManifestCreate = serde_json::from_value(create_body()).unwrap();
        let created = state.pipeline.create(req).await.unwrap();

        let Json(result) = handle_verify(State(state), Ok(Path(created.id))).await.unwrap();
        assert_eq!(result.id, created.id);
        assert!(result.valid);
    }
}
