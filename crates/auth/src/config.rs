//! # Auth service configuration and shared state
//!
//! Environment variables (all optional, development defaults shown):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AUTH_BIND_ADDR` | `0.0.0.0:3000` |
//! | `AUTH_DATABASE_PATH` | `pluto-auth.db` |
//! | `AUTH_TOKEN_ISSUER` | `pluto-auth` |
//! | `AUTH_TOKEN_ALGORITHM` | `eddsa` (`es256` also accepted) |
//! | `AUTH_SIGNING_KEY` | unset: a random key is generated |
//! | `AUTH_TOKEN_TTL_SECS` | `3600` |
//! | `AUTH_REFRESH_THRESHOLD_SECS` | `300` |
//!
//! `AUTH_SIGNING_KEY` is the Base64 of a PKCS#8 PEM private key matching
//! `AUTH_TOKEN_ALGORITHM`.

use std::sync::Arc;

use anyhow::Context;
use pluto_core::SystemClock;
use pluto_crypto::{generate_bearer_pem, BearerAlgorithm, BearerKeyMaterial, BearerTokenSigner};

use crate::ledger::{IssuancePolicy, SessionLedger};
use crate::storage::SqliteSessionStore;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub issuer: String,
    pub algorithm: BearerAlgorithm,
    pub signing_key: Option<String>,
    pub policy: IssuancePolicy,
}

impl AuthConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let seconds = |key: &str, default: i64| -> anyhow::Result<i64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("{key} must be an integer number of seconds")),
                None => Ok(default),
            }
        };

        let defaults = IssuancePolicy::default();
        let policy = IssuancePolicy {
            window_secs: seconds("AUTH_TOKEN_TTL_SECS", defaults.window_secs)?,
            refresh_threshold_secs: seconds(
                "AUTH_REFRESH_THRESHOLD_SECS",
                defaults.refresh_threshold_secs,
            )?,
        };
        if policy.refresh_threshold_secs < 0 || policy.window_secs <= policy.refresh_threshold_secs
        {
            anyhow::bail!(
                "AUTH_TOKEN_TTL_SECS ({}) must exceed AUTH_REFRESH_THRESHOLD_SECS ({})",
                policy.window_secs,
                policy.refresh_threshold_secs
            );
        }

        let algorithm = get("AUTH_TOKEN_ALGORITHM", "eddsa")
            .parse::<BearerAlgorithm>()
            .context("AUTH_TOKEN_ALGORITHM")?;

        Ok(Self {
            bind_addr: get("AUTH_BIND_ADDR", "0.0.0.0:3000"),
            database_path: get("AUTH_DATABASE_PATH", "pluto-auth.db"),
            issuer: get("AUTH_TOKEN_ISSUER", "pluto-auth"),
            algorithm,
            signing_key: lookup("AUTH_SIGNING_KEY").filter(|k| !k.trim().is_empty()),
            policy,
        })
    }
}

/// Shared state of the auth service.
pub struct AuthState {
    pub ledger: SessionLedger,
}

impl AuthState {
    pub fn new(ledger: SessionLedger) -> Self {
        Self { ledger }
    }

    /// Load keys, open the store and assemble the ledger. Fails fast on bad
    /// key material.
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        let material = match &config.signing_key {
            Some(encoded) => BearerKeyMaterial::from_base64_pem(config.algorithm, encoded)?,
            None => {
                tracing::warn!(
                    algorithm = %config.algorithm,
                    "AUTH_SIGNING_KEY is not set, generating an ephemeral key (development only)"
                );
                BearerKeyMaterial::from_pem(config.algorithm, generate_bearer_pem(config.algorithm)?)?
            }
        };
        let signer = BearerTokenSigner::new(&material, config.issuer.clone())?;
        tracing::info!(
            algorithm = %signer.algorithm(),
            issuer = %signer.issuer(),
            "bearer token signer ready"
        );

        let store = SqliteSessionStore::open(&config.database_path)?;
        let ledger = SessionLedger::new(
            Arc::new(store),
            Arc::new(signer),
            Arc::new(SystemClock),
            config.policy,
        );
        Ok(Self::new(ledger))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64::Engine;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.issuer, "pluto-auth");
        assert_eq!(config.algorithm, BearerAlgorithm::EdDsa);
        assert!(config.signing_key.is_none());
        assert_eq!(config.policy, IssuancePolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("AUTH_TOKEN_ALGORITHM", "ES256"),
            ("AUTH_TOKEN_TTL_SECS", "7200"),
            ("AUTH_REFRESH_THRESHOLD_SECS", "600"),
        ]))
        .unwrap();
        assert_eq!(config.algorithm, BearerAlgorithm::Es256);
        assert_eq!(config.policy.window_secs, 7200);
        assert_eq!(config.policy.refresh_threshold_secs, 600);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AuthConfig::from_lookup(lookup(&[("AUTH_TOKEN_TTL_SECS", "1h")])).is_err());
        assert!(AuthConfig::from_lookup(lookup(&[("AUTH_TOKEN_ALGORITHM", "rs256")])).is_err());
        assert!(AuthConfig::from_lookup(lookup(&[
            ("AUTH_TOKEN_TTL_SECS", "300"),
            ("AUTH_REFRESH_THRESHOLD_SECS", "300"),
        ]))
        .is_err());
    }

    #[test]
    fn test_mismatched_key_fails_fast() {
        let pem = generate_bearer_pem(BearerAlgorithm::EdDsa).unwrap();
        let config = AuthConfig {
            algorithm: BearerAlgorithm::Es256,
            signing_key: Some(pluto_crypto::b64().encode(pem)),
            database_path: ":memory:".into(),
            ..AuthConfig::from_lookup(lookup(&[])).unwrap()
        };
        assert!(AuthState::from_config(&config).is_err());
    }
}
