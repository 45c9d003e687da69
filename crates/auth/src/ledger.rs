//! # Session ledger
//!
//! Decides per device fingerprint whether a login reuses, creates or
//! rotates a session. State is derived from the store on every request:
//!
//! | Active session | Remaining lifetime | Action |
//! |----------------|--------------------|--------|
//! | none | - | create, sign new jti |
//! | yes | more than threshold | re-sign existing jti and expiry, no write |
//! | yes | threshold or less (incl. expired) | revoke + create in one transaction |
//!
//! Tokens are signed before anything is persisted, so a signer failure
//! never leaves a session without a token. A store `Conflict` means another
//! request won a race; the ledger re-reads and re-evaluates exactly once.

use std::sync::Arc;

use pluto_core::{CanonicalizationError, Clock, Fingerprint};
use pluto_crypto::{BearerTokenSigner, CryptoError};
use pluto_types::{LoginRequest, LoginResponse, PublicKeyResponse};
use uuid::Uuid;

use crate::storage::{SessionRecord, SessionStore, StoreError};

/// Token signing capability consumed by the ledger.
pub trait TokenSigner: Send + Sync {
    fn sign(
        &self,
        fingerprint: &Fingerprint,
        jti: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, CryptoError>;

    fn public_key(&self) -> String;
}

impl TokenSigner for BearerTokenSigner {
    fn sign(
        &self,
        fingerprint: &Fingerprint,
        jti: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, CryptoError> {
        BearerTokenSigner::sign(self, fingerprint.as_bytes(), jti, issued_at, expires_at)
    }

    fn public_key(&self) -> String {
        BearerTokenSigner::public_key(self).to_string()
    }
}

/// Token lifetime rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuancePolicy {
    /// Lifetime of a newly issued session (seconds)
    pub window_secs: i64,
    /// A session expiring within this many seconds is rotated
    pub refresh_threshold_secs: i64,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            refresh_threshold_secs: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("fingerprint: {0}")]
    Fingerprint(#[from] CanonicalizationError),
    #[error("token signing: {0}")]
    Signing(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Store conflict persisted after the single re-evaluation
    #[error("session contention not resolved after retry: {0}")]
    Contention(String),
}

#[derive(Debug)]
enum SessionState {
    NoActiveSession,
    ActiveFresh(SessionRecord),
    ActiveStale(SessionRecord),
}

fn classify(active: Option<SessionRecord>, now: i64, policy: &IssuancePolicy) -> SessionState {
    match active {
        None => SessionState::NoActiveSession,
        Some(s) if s.expires_at - now > policy.refresh_threshold_secs => {
            SessionState::ActiveFresh(s)
        }
        Some(s) => SessionState::ActiveStale(s),
    }
}

pub struct SessionLedger {
    store: Arc<dyn SessionStore>,
    signer: Arc<dyn TokenSigner>,
    clock: Arc<dyn Clock>,
    policy: IssuancePolicy,
}

impl SessionLedger {
    pub fn new(
        store: Arc<dyn SessionStore>,
        signer: Arc<dyn TokenSigner>,
        clock: Arc<dyn Clock>,
        policy: IssuancePolicy,
    ) -> Self {
        Self {
            store,
            signer,
            clock,
            policy,
        }
    }

    /// Issue or reuse a bearer token for the requesting device.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, LedgerError> {
        let fingerprint = Fingerprint::from_login(req)?;

        match self.evaluate(&fingerprint).await {
            Err(LedgerError::Store(StoreError::Conflict(detail))) => {
                tracing::info!(
                    fingerprint = %fingerprint.digest_hex(),
                    detail = %detail,
                    "concurrent login detected, re-evaluating session"
                );
                match self.evaluate(&fingerprint).await {
                    Err(LedgerError::Store(StoreError::Conflict(detail))) => {
                        Err(LedgerError::Contention(detail))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    pub fn public_key(&self) -> PublicKeyResponse {
        PublicKeyResponse {
            public_key: self.signer.public_key(),
        }
    }

    async fn evaluate(&self, fingerprint: &Fingerprint) -> Result<LoginResponse, LedgerError> {
        let now = self.clock.now();
        let active = self.store.find_active(fingerprint).await?;

        match classify(active, now, &self.policy) {
            SessionState::ActiveFresh(session) => {
                let access_token =
                    self.signer
                        .sign(fingerprint, &session.jti, now, session.expires_at)?;
                tracing::debug!(
                    session_id = %session.id,
                    fingerprint = %fingerprint.digest_hex(),
                    "reusing active session"
                );
                Ok(LoginResponse {
                    access_token,
                    expires_in: session.expires_at - now,
                    session_id: session.id,
                })
            }
            SessionState::NoActiveSession => self.issue(fingerprint, now, None).await,
            SessionState::ActiveStale(session) => {
                self.issue(fingerprint, now, Some(session.id)).await
            }
        }
    }

    async fn issue(
        &self,
        fingerprint: &Fingerprint,
        now: i64,
        replaces: Option<Uuid>,
    ) -> Result<LoginResponse, LedgerError> {
        let session = SessionRecord {
            id: Uuid::new_v4(),
            fingerprint: fingerprint.clone(),
            jti: Uuid::new_v4().to_string(),
            expires_at: now + self.policy.window_secs,
            revoked: false,
            created_at: now,
        };
        let access_token = self
            .signer
            .sign(fingerprint, &session.jti, now, session.expires_at)?;

        match replaces {
            None => self.store.create(&session).await?,
            Some(stale) => self.store.rotate(stale, &session).await?,
        }

        tracing::info!(
            session_id = %session.id,
            replaced = ?replaces,
            fingerprint = %fingerprint.digest_hex(),
            "issued new session"
        );
        Ok(LoginResponse {
            access_token,
            expires_in: self.policy.window_secs,
            session_id: session.id,
        })
    }
}
