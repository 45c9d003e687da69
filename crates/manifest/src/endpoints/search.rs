//! # GET /manifests/search

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use pluto_types::{ManifestMeta, SearchParams};

use crate::config::ManifestState;
use crate::endpoints::requester_locale;
use crate::error::ManifestError;

/// Title/description substring search in the requester locale or `en`.
pub async fn handle_search(
    State(state): State<Arc<ManifestState>>,
    headers: HeaderMap,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<ManifestMeta>>, ManifestError> {
    let Query(params) = params.map_err(|e| ManifestError::Validation(e.body_text()))?;
    let locale = requester_locale(&state, &headers);
    let metas = state.pipeline.search(&params.query, &locale).await?;
    Ok(Json(metas))
}

#[cfg(test)]
mod tests {
    use pluto_types::ManifestCreate;

    use super::*;
    use crate::endpoints::test_helpers::{create_body, test_state};

    fn query(q: &str) -> Result<Query<SearchParams>, QueryRejection> {
        Ok(Query(SearchParams {
            query: q.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_search() {
        let (state, _) = test_state();
        let req: ManifestCreate = serde_json::from_value(create_body()).unwrap();
        state.pipeline.create(req).await.unwrap();

        let Json(hits) = handle_search(State(state.clone()), HeaderMap::new(), query("radar"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let result = handle_search(State(state), HeaderMap::new(), query("")).await;
        assert!(matches!(result, Err(ManifestError::Validation(_))));
    }
}
