//! # Pluto shared type definitions
//!
//! Request and response structures exchanged by the auth and manifest
//! services, plus the manifest data model they persist.
//!
//! ## Encoding rules
//! - UUIDs: hyphenated lowercase text.
//! - Timestamps: Unix seconds.
//! - Signatures: Base64 (standard alphabet).
//! - Public keys: PEM (bearer tokens) or Base64 raw bytes (manifest signatures).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Auth service
// ---------------------------------------------------------------------------

/// Device login request. The four fields together form the device fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub device_id: String,
    pub os: String,
    pub app_version: String,
    /// Free-form extra device attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Bearer token issued for a device session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Compact signed token
    pub access_token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    /// Session the token is bound to
    pub session_id: Uuid,
}

/// Exported verification key of a signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Uniform JSON error body. `message` never carries internal detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Manifest service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Script envelope. Manifests embed their script as `{"code": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEnvelope {
    pub code: String,
}

/// Per-locale key/value strings, e.g. `{"en": {"title": "...", "description": "..."}}`.
pub type LocalizationMap = BTreeMap<String, BTreeMap<String, String>>;

/// Manifest creation request.
///
/// `ui`, `script` and `actions` are carried as raw JSON values; the manifest
/// pipeline validates the script envelope and canonicalizes the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCreate {
    pub author: Author,
    pub category: String,
    pub icon: String,
    /// Caller order is significant
    pub tags: Vec<String>,
    /// Caller order is significant
    pub permissions: Vec<String>,
    pub ui: serde_json::Value,
    pub script: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<serde_json::Value>>,
    pub localization: LocalizationMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCreateResponse {
    pub id: Uuid,
}

/// Manifest metadata as seen by a requester, localized to their locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub id: Uuid,
    pub version: String,
    pub icon: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: Author,
    pub created_at: i64,
    pub title: String,
    pub description: String,
}

/// Full manifest read response.
///
/// Carries everything a verifier needs to rebuild the signed canonical
/// payload: meta, permissions, script code, ui and actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestView {
    pub meta: ManifestMeta,
    /// Localized strings after locale fallback
    pub localization: BTreeMap<String, String>,
    pub ui: serde_json::Value,
    pub script: ScriptEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<serde_json::Value>>,
    pub permissions: Vec<String>,
    /// Base64 Ed25519 signature over the canonical payload
    pub signature: String,
}

/// `GET /manifests` query parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// `GET /manifests/search` query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

/// Result of re-verifying a stored manifest signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub id: Uuid,
    pub valid: bool,
}
