//! Shared fixtures for endpoint tests.

use std::sync::Arc;

use pluto_core::ManualClock;
use pluto_crypto::{generate_bearer_pem, BearerAlgorithm, BearerKeyMaterial, BearerTokenSigner};

use crate::config::AuthState;
use crate::ledger::{IssuancePolicy, SessionLedger};
use crate::storage::SqliteSessionStore;

/// Auth state over an in-memory store and a fresh EdDSA key. The signer is
/// returned too so tests can verify issued tokens.
pub fn test_state() -> (Arc<AuthState>, Arc<BearerTokenSigner>) {
    let pem = generate_bearer_pem(BearerAlgorithm::EdDsa).unwrap();
    let material = BearerKeyMaterial::from_pem(BearerAlgorithm::EdDsa, pem).unwrap();
    let signer = Arc::new(BearerTokenSigner::new(&material, "pluto-auth").unwrap());

    let ledger = SessionLedger::new(
        Arc::new(SqliteSessionStore::in_memory().unwrap()),
        signer.clone(),
        Arc::new(ManualClock::starting_now()),
        IssuancePolicy::default(),
    );
    (Arc::new(AuthState::new(ledger)), signer)
}
