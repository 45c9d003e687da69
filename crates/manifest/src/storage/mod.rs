//! # Manifest store
//!
//! A manifest is three row groups (`manifests`, `manifest_content`,
//! `localizations`) written in one transaction. Reads return both the
//! requested locale and `en` so callers can fall back per field.
//!
//! The SQLite implementation lives in the `sqlite` submodule.

pub mod sqlite;

pub use sqlite::SqliteManifestStore;

use pluto_types::{Author, LocalizationMap, ManifestMeta};
use serde_json::Value;
use uuid::Uuid;

/// Everything persisted for a new manifest.
#[derive(Debug, Clone)]
pub struct NewManifest {
    pub id: Uuid,
    pub version: String,
    pub icon: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: Author,
    /// Base64 detached signature over the canonical payload
    pub signature: String,
    pub created_at: i64,
    pub ui: Value,
    /// Extracted script source
    pub script_code: String,
    pub actions: Option<Vec<Value>>,
    pub permissions: Vec<String>,
    /// All supplied locales
    pub localization: LocalizationMap,
}

/// A manifest as read back. `localization` holds at most the requested
/// locale and `en`.
#[derive(Debug, Clone)]
pub struct StoredManifest {
    pub id: Uuid,
    pub version: String,
    pub icon: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: Author,
    pub signature: String,
    pub created_at: i64,
    pub ui: Value,
    pub script_code: String,
    pub actions: Option<Vec<Value>>,
    pub permissions: Vec<String>,
    pub localization: LocalizationMap,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Constraint violation, e.g. a duplicate id
    #[error("manifest write conflict: {0}")]
    Conflict(String),
    /// The caller went away before commit; the transaction was rolled back
    #[error("manifest write abandoned before commit")]
    Abandoned,
    /// Stored row could not be decoded
    #[error("corrupt manifest row: {0}")]
    Corrupt(String),
    /// Connection, SQL or task failure
    #[error("manifest store failure: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait ManifestStore: Send + Sync {
    /// Insert all three row groups atomically.
    ///
    /// If the returned future is dropped before the transaction commits,
    /// the transaction rolls back.
    async fn insert(&self, manifest: NewManifest) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid, locale: &str) -> Result<Option<StoredManifest>, StoreError>;

    /// Newest first. `title`/`description` already fall back to `en`.
    async fn list(
        &self,
        limit: i64,
        offset: i64,
        locale: &str,
    ) -> Result<Vec<ManifestMeta>, StoreError>;

    /// Case-insensitive substring match on `title`/`description` in
    /// `locale` or `en`, newest first, at most `limit` rows.
    async fn search(
        &self,
        query: &str,
        locale: &str,
        limit: i64,
    ) -> Result<Vec<ManifestMeta>, StoreError>;
}
