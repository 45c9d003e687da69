//! # POST /auth/app-login

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use pluto_types::{LoginRequest, LoginResponse};

use crate::config::AuthState;
use crate::error::AuthError;

/// Issue a bearer token for the device described by the body.
///
/// Repeated logins from the same device within the session window return
/// the same `session_id`.
pub async fn handle_app_login(
    State(state): State<Arc<AuthState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(request) = body.map_err(|e| AuthError::BadRequest(e.body_text()))?;
    let response = state.ledger.login(&request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::test_helpers::test_state;

    fn request() -> LoginRequest {
        serde_json::from_value(serde_json::json!({
            "device_id": "pixel-8",
            "os": "android",
            "app_version": "1.4.0",
            "additional": {"locale": "en-US", "model": "GKWS6"},
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_then_reuse() {
        let (state, signer) = test_state();

        let Json(first) = handle_app_login(State(state.clone()), Ok(Json(request())))
            .await
            .unwrap();
        let Json(second) = handle_app_login(State(state), Ok(Json(request())))
            .await
            .unwrap();

        assert_eq!(first.session_id, second.session_id);
        let claims = signer.verify(&second.access_token).unwrap();
        assert_eq!(claims.iss, "pluto-auth");
        assert_eq!(claims.sub, claims.jti);
    }

    #[tokio::test]
    async fn test_additional_key_order_irrelevant() {
        let (state, _) = test_state();
        let mut reordered = request();
        reordered.additional = serde_json::from_value(serde_json::json!({
            "model": "GKWS6",
            "locale": "en-US",
        }))
        .unwrap();

        let Json(a) = handle_app_login(State(state.clone()), Ok(Json(request())))
            .await
            .unwrap();
        let Json(b) = handle_app_login(State(state), Ok(Json(reordered)))
            .await
            .unwrap();
        assert_eq!(a.session_id, b.session_id);
    }
}
