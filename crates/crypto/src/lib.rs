//! # Pluto signing primitives
//!
//! Two independent signer types share this crate:
//!
//! | Signer | Purpose | Algorithm | Exported key |
//! |--------|---------|-----------|--------------|
//! | [`BearerTokenSigner`] | device session tokens | EdDSA (Ed25519) or ES256 (P-256), fixed at construction | SPKI PEM |
//! | [`DetachedSigner`] | manifest content integrity | Ed25519 | Base64 raw 32 bytes |
//!
//! Key material is decoded once at process start and never mutated, so both
//! signers are shared across request tasks behind an `Arc` without locking.
//! Construction runs a sign/verify self-test and fails fast on bad keys.

mod bearer;
mod detached;

use sha2::{Digest, Sha256};

pub use bearer::{generate_bearer_pem, BearerAlgorithm, BearerClaims, BearerKeyMaterial, BearerTokenSigner};
pub use detached::{generate_detached_key, verify_detached, DetachedSigner};

pub use ed25519_dalek::{
    Signature as Ed25519Signature, SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
};

/// Signing and key-loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material is not valid Base64 / UTF-8 PEM
    #[error("failed to decode key material: {0}")]
    KeyDecode(String),
    /// Decoded key does not fit the configured algorithm family
    #[error("invalid key for {algorithm}: {reason}")]
    InvalidKey {
        algorithm: &'static str,
        reason: String,
    },
    /// Sign/verify round-trip at construction failed
    #[error("signer self-test failed: {0}")]
    SelfTestFailed(String),
    /// Producing a signature or token failed
    #[error("signing failed: {0}")]
    Signing(String),
    /// Signature did not verify
    #[error("signature verification failed")]
    SignatureVerifyError,
    /// Token was malformed, expired, or signed by another key
    #[error("token rejected: {0}")]
    TokenRejected(String),
}

/// Base64 engine (Standard)
pub fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// SHA-256 hash.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"abc");
        assert_eq!(
            hash[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "SHA-256(\"abc\") prefix mismatch"
        );
    }
}
