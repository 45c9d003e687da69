//! # Detached signature signer
//!
//! Ed25519 signatures over canonical manifest bytes. The signature is stored
//! next to the content and verified by recomputing the canonical bytes.

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::{b64, CryptoError};

const ALGORITHM: &str = "Ed25519";

/// Signs canonical content bytes.
pub struct DetachedSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl DetachedSigner {
    /// Load from Base64 key material and run the sign/verify self-test.
    ///
    /// Accepts a 32-byte seed or a 64-byte `seed || public` key pair. For the
    /// 64-byte form the public half must match the seed.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = b64()
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyDecode(format!("detached key is not Base64: {e}")))?;

        let invalid = |reason: String| CryptoError::InvalidKey {
            algorithm: ALGORITHM,
            reason,
        };
        let signing_key = match bytes.len() {
            32 => {
                let seed: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| invalid("seed must be 32 bytes".into()))?;
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let pair: [u8; 64] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| invalid("key pair must be 64 bytes".into()))?;
                SigningKey::from_keypair_bytes(&pair)
                    .map_err(|e| invalid(format!("public half does not match seed: {e}")))?
            }
            n => return Err(invalid(format!("expected 32 or 64 bytes, got {n}"))),
        };

        let signer = Self::from_signing_key(signing_key);
        signer.self_test()?;
        Ok(signer)
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    fn self_test(&self) -> Result<(), CryptoError> {
        let probe = b"pluto-detached-self-test";
        let signature = self.sign(probe);
        self.verify(probe, &signature)
            .map_err(|e| CryptoError::SelfTestFailed(e.to_string()))
    }

    /// Sign `message` and return the Base64 signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        b64().encode(signature.to_bytes())
    }

    /// Verify a Base64 signature over `message`.
    pub fn verify(&self, message: &[u8], signature_b64: &str) -> Result<(), CryptoError> {
        verify_with_key(&self.verifying_key, message, signature_b64)
    }

    /// Base64 of the raw 32-byte public key.
    pub fn public_key(&self) -> String {
        b64().encode(self.verifying_key.to_bytes())
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

/// Verify a detached signature with an exported Base64 public key.
pub fn verify_detached(
    public_key_b64: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), CryptoError> {
    let key_bytes = b64()
        .decode(public_key_b64.trim())
        .map_err(|e| CryptoError::KeyDecode(format!("public key is not Base64: {e}")))?;
    let key_arr: [u8; 32] = key_bytes.try_into().map_err(|_| CryptoError::InvalidKey {
        algorithm: ALGORITHM,
        reason: "public key must be 32 bytes".into(),
    })?;
    let verifying_key = VerifyingKey::from_bytes(&key_arr).map_err(|e| CryptoError::InvalidKey {
        algorithm: ALGORITHM,
        reason: e.to_string(),
    })?;
    verify_with_key(&verifying_key, message, signature_b64)
}

fn verify_with_key(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), CryptoError> {
    let sig_bytes = b64()
        .decode(signature_b64)
        .map_err(|_| CryptoError::SignatureVerifyError)?;
    let sig_arr: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::SignatureVerifyError)?;
    let signature = Signature::from_bytes(&sig_arr);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}

/// Generate a fresh 32-byte seed, Base64 encoded.
pub fn generate_detached_key() -> String {
    let key = SigningKey::generate(&mut rand::rngs::OsRng);
    b64().encode(key.to_bytes())
}
