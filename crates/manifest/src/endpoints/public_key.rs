//! # GET /public-key
//!
//! Base64 of the raw Ed25519 key that verifies manifest signatures.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pluto_types::PublicKeyResponse;

use crate::config::ManifestState;

pub async fn handle_public_key(State(state): State<Arc<ManifestState>>) -> Json<PublicKeyResponse> {
    Json(state.pipeline.public_key())
}
