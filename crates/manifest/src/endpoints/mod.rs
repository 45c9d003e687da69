//! # Manifest endpoints
//!
//! - `POST /manifests`: sign and store a manifest (bounded by the request timeout)
//! - `GET /manifests?limit&offset`: newest first
//! - `GET /manifests/search?query`
//! - `GET /manifests/{id}`
//! - `GET /manifests/{id}/verify`
//! - `GET /public-key`: detached signature verification key
//! - `GET /health`
//!
//! Read endpoints localize to the `Accept-Language` locale.

pub mod create;
pub mod get;
pub mod health;
pub mod list;
pub mod public_key;
pub mod search;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use create::handle_create;
pub use get::handle_get;
pub use health::handle_health;
pub use list::handle_list;
pub use public_key::handle_public_key;
pub use search::handle_search;
pub use verify::handle_verify;

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::config::ManifestState;

pub fn router(state: Arc<ManifestState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/manifests",
            axum::routing::post(handle_create).get(handle_list),
        )
        .route("/manifests/search", axum::routing::get(handle_search))
        .route("/manifests/{id}", axum::routing::get(handle_get))
        .route("/manifests/{id}/verify", axum::routing::get(handle_verify))
        .route("/public-key", axum::routing::get(handle_public_key))
        .route("/health", axum::routing::get(handle_health))
        .with_state(state)
}

/// Locale of the requester, from `Accept-Language`.
pub(crate) fn requester_locale(state: &ManifestState, headers: &HeaderMap) -> String {
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    state.locales.resolve(accept_language)
}
