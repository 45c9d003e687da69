//! # Auth endpoints
//!
//! - `POST /auth/app-login`: issue or reuse a device session token
//! - `GET /auth/public-key`: bearer token verification key (SPKI PEM)
//! - `GET /health`

pub mod app_login;
pub mod health;
pub mod public_key;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use app_login::handle_app_login;
pub use health::handle_health;
pub use public_key::handle_public_key;

use std::sync::Arc;

use crate::config::AuthState;

pub fn router(state: Arc<AuthState>) -> axum::Router {
    axum::Router::new()
        .route("/auth/app-login", axum::routing::post(handle_app_login))
        .route("/auth/public-key", axum::routing::get(handle_public_key))
        .route("/health", axum::routing::get(handle_health))
        .with_state(state)
}
