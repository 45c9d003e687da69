//! # Device fingerprint
//!
//! Canonical JSON of `{additional?, app_version, device_id, os}`. Two logins
//! share a session exactly when their fingerprints are byte-equal, so key
//! order and whitespace of the request body never matter.

use pluto_types::LoginRequest;
use serde_json::{json, Value};

use crate::canonical::canonicalize;
use crate::CanonicalizationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_login(req: &LoginRequest) -> Result<Self, CanonicalizationError> {
        let mut value = json!({
            "device_id": req.device_id,
            "os": req.os,
            "app_version": req.app_version,
        });
        if let (Some(additional), Some(obj)) = (&req.additional, value.as_object_mut()) {
            obj.insert("additional".to_string(), Value::Object(additional.clone()));
        }

        let bytes = canonicalize(&value)?;
        String::from_utf8(bytes)
            .map(Self)
            .map_err(|e| CanonicalizationError::Encode(e.to_string()))
    }

    /// Rehydrate a fingerprint read back from storage.
    pub fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hex SHA-256 of the fingerprint. Safe to log.
    pub fn digest_hex(&self) -> String {
        hex::encode(pluto_crypto::sha256(self.as_bytes()))
    }
}
