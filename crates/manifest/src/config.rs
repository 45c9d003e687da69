//! # Manifest service configuration and shared state
//!
//! Environment variables (all optional, development defaults shown):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MANIFEST_BIND_ADDR` | `0.0.0.0:3001` |
//! | `MANIFEST_DATABASE_PATH` | `pluto-manifest.db` |
//! | `MANIFEST_SIGNING_KEY` | unset: a random key is generated |
//! | `MANIFEST_VERSION` | `1.0.0` |
//! | `MANIFEST_REQUEST_TIMEOUT_SECS` | `10` |
//! | `MANIFEST_SUPPORTED_LOCALES` | unset: any language subtag |
//!
//! `MANIFEST_SIGNING_KEY` is the Base64 of a 32-byte Ed25519 seed or a
//! 64-byte `seed || public` key pair. `MANIFEST_SUPPORTED_LOCALES` is a
//! comma-separated list such as `en,ja,de`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pluto_core::SystemClock;
use pluto_crypto::{generate_detached_key, DetachedSigner};

use crate::locale::{LocaleResolver, DEFAULT_LOCALE};
use crate::pipeline::ManifestPipeline;
use crate::storage::SqliteManifestStore;

#[derive(Debug, Clone)]
pub struct ManifestConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub signing_key: Option<String>,
    pub version: String,
    pub request_timeout: Duration,
    pub supported_locales: Option<BTreeSet<String>>,
}

impl ManifestConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let timeout_secs = match lookup("MANIFEST_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("MANIFEST_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            None => 10,
        };
        if timeout_secs == 0 {
            anyhow::bail!("MANIFEST_REQUEST_TIMEOUT_SECS must be positive");
        }

        let supported_locales = lookup("MANIFEST_SUPPORTED_LOCALES").map(|raw| {
            let mut set: BTreeSet<String> = raw
                .split(',')
                .map(|l| l.trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty())
                .collect();
            set.insert(DEFAULT_LOCALE.to_string());
            set
        });

        Ok(Self {
            bind_addr: get("MANIFEST_BIND_ADDR", "0.0.0.0:3001"),
            database_path: get("MANIFEST_DATABASE_PATH", "pluto-manifest.db"),
            signing_key: lookup("MANIFEST_SIGNING_KEY").filter(|k| !k.trim().is_empty()),
            version: get("MANIFEST_VERSION", "1.0.0"),
            request_timeout: Duration::from_secs(timeout_secs),
            supported_locales,
        })
    }
}

/// Shared state of the manifest service.
pub struct ManifestState {
    pub pipeline: ManifestPipeline,
    pub locales: LocaleResolver,
    pub request_timeout: Duration,
}

impl ManifestState {
    /// Load the signing key, open the store and assemble the pipeline.
    /// Fails fast on bad key material.
    pub fn from_config(config: &ManifestConfig) -> anyhow::Result<Self> {
        let signer = match &config.signing_key {
            Some(encoded) => DetachedSigner::from_base64(encoded)?,
            None => {
                tracing::warn!(
                    "MANIFEST_SIGNING_KEY is not set, generating an ephemeral key (development only)"
                );
                DetachedSigner::from_base64(&generate_detached_key())?
            }
        };
        tracing::info!(public_key = %signer.public_key(), "manifest signer ready");

        let store = SqliteManifestStore::open(&config.database_path)?;
        let pipeline = ManifestPipeline::new(
            Arc::new(store),
            Arc::new(signer),
            Arc::new(SystemClock),
            config.version.clone(),
        );
        Ok(Self {
            pipeline,
            locales: LocaleResolver::new(config.supported_locales.clone()),
            request_timeout: config.request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

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
        let config = ManifestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.supported_locales.is_none());
    }

    #[test]
    fn test_supported_locales_always_include_en() {
        let config =
            ManifestConfig::from_lookup(lookup(&[("MANIFEST_SUPPORTED_LOCALES", "JA, de,")]))
                .unwrap();
        let locales = config.supported_locales.unwrap();
        assert_eq!(
            locales.into_iter().collect::<Vec<_>>(),
            vec!["de", "en", "ja"]
        );
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        assert!(
            ManifestConfig::from_lookup(lookup(&[("MANIFEST_REQUEST_TIMEOUT_SECS", "0")])).is_err()
        );
        assert!(
            ManifestConfig::from_lookup(lookup(&[("MANIFEST_REQUEST_TIMEOUT_SECS", "ten")]))
                .is_err()
        );
    }

    #[test]
    fn test_bad_signing_key_fails_fast() {
        let config = ManifestConfig {
            signing_key: Some("not base64!".into()),
            database_path: ":memory:".into(),
            ..ManifestConfig::from_lookup(lookup(&[])).unwrap()
        };
        assert!(ManifestState::from_config(&config).is_err());
    }
}
