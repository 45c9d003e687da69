//! # GET /auth/public-key

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pluto_types::PublicKeyResponse;

use crate::config::AuthState;

pub async fn handle_public_key(State(state): State<Arc<AuthState>>) -> Json<PublicKeyResponse> {
    Json(state.ledger.public_key())
}
