//! # Session store
//!
//! Persistence seam of the session ledger. At most one non-revoked session
//! exists per fingerprint; the store enforces that itself and reports a lost
//! race as [`StoreError::Conflict`] instead of letting the caller
//! check-then-act.
//!
//! The SQLite implementation lives in the `sqlite` submodule.

pub mod sqlite;

pub use sqlite::SqliteSessionStore;

use pluto_core::Fingerprint;
use uuid::Uuid;

/// Persisted device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub fingerprint: Fingerprint,
    /// Token identifier, unique across all sessions
    pub jti: String,
    /// Unix seconds
    pub expires_at: i64,
    pub revoked: bool,
    /// Unix seconds
    pub created_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer got there first (uniqueness violation or lost revoke)
    #[error("session write conflict: {0}")]
    Conflict(String),
    /// Connection, SQL or task failure
    #[error("session store failure: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// The non-revoked session for `fingerprint`, expired or not.
    async fn find_active(&self, fingerprint: &Fingerprint)
        -> Result<Option<SessionRecord>, StoreError>;

    /// Insert a new active session. `Conflict` if one already exists.
    async fn create(&self, session: &SessionRecord) -> Result<(), StoreError>;

    /// Revoke `stale` and insert `next` in one transaction.
    ///
    /// `Conflict` when `stale` is no longer active or `next` collides; nothing
    /// is written in that case.
    async fn rotate(&self, stale: Uuid, next: &SessionRecord) -> Result<(), StoreError>;
}
