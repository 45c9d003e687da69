//! # Bearer token signer
//!
//! Compact JWS tokens carrying the registered claims `iss`, `sub`, `jti`,
//! `iat`, `exp` and the device fingerprint as the opaque `fp` claim.
//!
//! Key material is a Base64-encoded PKCS#8 PEM private key. The public key is
//! derived from it and exported as SPKI PEM for external verifiers.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{b64, unix_now, CryptoError};

/// Bearer token signature algorithm, fixed per service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerAlgorithm {
    /// Ed25519
    EdDsa,
    /// ECDSA P-256 / SHA-256
    Es256,
}

impl BearerAlgorithm {
    fn jwt_algorithm(self) -> Algorithm {
        match self {
            BearerAlgorithm::EdDsa => Algorithm::EdDSA,
            BearerAlgorithm::Es256 => Algorithm::ES256,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BearerAlgorithm::EdDsa => "EdDSA",
            BearerAlgorithm::Es256 => "ES256",
        }
    }
}

impl fmt::Display for BearerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BearerAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eddsa" | "ed25519" => Ok(BearerAlgorithm::EdDsa),
            "es256" | "p256" | "p-256" => Ok(BearerAlgorithm::Es256),
            other => Err(CryptoError::KeyDecode(format!(
                "unsupported bearer algorithm: {other}"
            ))),
        }
    }
}

/// Claims embedded in every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
    pub iss: String,
    /// Token identifier of the session (same value as `jti`)
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    /// Canonical fingerprint JSON, opaque to verifiers
    pub fp: String,
}

/// Decoded bearer key material.
pub struct BearerKeyMaterial {
    algorithm: BearerAlgorithm,
    private_pem: String,
    public_pem: String,
}

impl BearerKeyMaterial {
    /// Decode Base64 PKCS#8 PEM key material for `algorithm`.
    ///
    /// Fails if the PEM does not hold a private key of that algorithm family.
    pub fn from_base64_pem(algorithm: BearerAlgorithm, encoded: &str) -> Result<Self, CryptoError> {
        let pem_bytes = b64()
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyDecode(format!("bearer key is not Base64: {e}")))?;
        let private_pem = String::from_utf8(pem_bytes)
            .map_err(|e| CryptoError::KeyDecode(format!("bearer key is not UTF-8 PEM: {e}")))?;
        Self::from_pem(algorithm, private_pem)
    }

    /// Build from a PKCS#8 PEM private key.
    pub fn from_pem(algorithm: BearerAlgorithm, private_pem: String) -> Result<Self, CryptoError> {
        let public_pem = match algorithm {
            BearerAlgorithm::EdDsa => ed25519_public_pem(&private_pem)?,
            BearerAlgorithm::Es256 => p256_public_pem(&private_pem)?,
        };
        Ok(Self {
            algorithm,
            private_pem,
            public_pem,
        })
    }

    pub fn algorithm(&self) -> BearerAlgorithm {
        self.algorithm
    }

    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }
}

fn ed25519_public_pem(private_pem: &str) -> Result<String, CryptoError> {
    use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
    use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePublicKey};

    let invalid = |reason: String| CryptoError::InvalidKey {
        algorithm: BearerAlgorithm::EdDsa.as_str(),
        reason,
    };
    let signing_key = ed25519_dalek::SigningKey::from_pkcs8_pem(private_pem)
        .map_err(|e| invalid(format!("not a PKCS#8 Ed25519 private key: {e}")))?;
    signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| invalid(format!("public key export failed: {e}")))
}

fn p256_public_pem(private_pem: &str) -> Result<String, CryptoError> {
    use p256::pkcs8::spki::der::pem::LineEnding;
    use p256::pkcs8::{DecodePrivateKey, EncodePublicKey};

    let invalid = |reason: String| CryptoError::InvalidKey {
        algorithm: BearerAlgorithm::Es256.as_str(),
        reason,
    };
    let secret = p256::SecretKey::from_pkcs8_pem(private_pem)
        .map_err(|e| invalid(format!("not a PKCS#8 P-256 private key: {e}")))?;
    secret
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| invalid(format!("public key export failed: {e}")))
}

/// Generate a fresh PKCS#8 PEM private key for `algorithm`.
pub fn generate_bearer_pem(algorithm: BearerAlgorithm) -> Result<String, CryptoError> {
    match algorithm {
        BearerAlgorithm::EdDsa => {
            use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
            use ed25519_dalek::pkcs8::EncodePrivateKey;
            let key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
            key.to_pkcs8_pem(LineEnding::LF)
                .map(|pem| pem.to_string())
                .map_err(|e| CryptoError::Signing(format!("PKCS#8 export failed: {e}")))
        }
        BearerAlgorithm::Es256 => {
            use p256::pkcs8::spki::der::pem::LineEnding;
            use p256::pkcs8::EncodePrivateKey;
            let key = p256::SecretKey::random(&mut rand::rngs::OsRng);
            key.to_pkcs8_pem(LineEnding::LF)
                .map(|pem| pem.to_string())
                .map_err(|e| CryptoError::Signing(format!("PKCS#8 export failed: {e}")))
        }
    }
}

/// Signs device session tokens.
pub struct BearerTokenSigner {
    algorithm: BearerAlgorithm,
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_pem: String,
}

impl BearerTokenSigner {
    /// Build a signer and run the sign/verify self-test.
    pub fn new(material: &BearerKeyMaterial, issuer: impl Into<String>) -> Result<Self, CryptoError> {
        let invalid = |reason: String| CryptoError::InvalidKey {
            algorithm: material.algorithm.as_str(),
            reason,
        };
        let (encoding_key, decoding_key) = match material.algorithm {
            BearerAlgorithm::EdDsa => (
                EncodingKey::from_ed_pem(material.private_pem.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?,
                DecodingKey::from_ed_pem(material.public_pem.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            BearerAlgorithm::Es256 => (
                EncodingKey::from_ec_pem(material.private_pem.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?,
                DecodingKey::from_ec_pem(material.public_pem.as_bytes())
                    .map_err(|e| invalid(e.to_string()))?,
            ),
        };

        let signer = Self {
            algorithm: material.algorithm,
            issuer: issuer.into(),
            encoding_key,
            decoding_key,
            public_pem: material.public_pem.clone(),
        };
        signer.self_test()?;
        Ok(signer)
    }

    fn self_test(&self) -> Result<(), CryptoError> {
        let now = unix_now();
        let token = self
            .sign(b"{}", "self-test", now, now + 60)
            .map_err(|e| CryptoError::SelfTestFailed(e.to_string()))?;
        let claims = self
            .verify(&token)
            .map_err(|e| CryptoError::SelfTestFailed(e.to_string()))?;
        if claims.jti != "self-test" || claims.fp != "{}" {
            return Err(CryptoError::SelfTestFailed(
                "round-trip claims do not match".into(),
            ));
        }
        Ok(())
    }

    /// Sign a token for session `jti` valid until `expires_at`.
    pub fn sign(
        &self,
        fingerprint: &[u8],
        jti: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, CryptoError> {
        let fp = std::str::from_utf8(fingerprint)
            .map_err(|_| CryptoError::Signing("fingerprint is not UTF-8".into()))?;
        let claims = BearerClaims {
            iss: self.issuer.clone(),
            sub: jti.to_string(),
            jti: jti.to_string(),
            iat: issued_at,
            exp: expires_at,
            fp: fp.to_string(),
        };
        jsonwebtoken::encode(
            &Header::new(self.algorithm.jwt_algorithm()),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and expiry of a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<BearerClaims, CryptoError> {
        let mut validation = Validation::new(self.algorithm.jwt_algorithm());
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        jsonwebtoken::decode::<BearerClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| CryptoError::TokenRejected(e.to_string()))
    }

    /// SPKI PEM of the verification key.
    pub fn public_key(&self) -> &str {
        &self.public_pem
    }

    pub fn algorithm(&self) -> BearerAlgorithm {
        self.algorithm
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}
