//! Shared fixtures for endpoint tests.

use std::sync::Arc;
use std::time::Duration;

use pluto_core::SystemClock;
use pluto_crypto::{generate_detached_key, DetachedSigner};
use serde_json::json;

use crate::config::ManifestState;
use crate::locale::LocaleResolver;
use crate::pipeline::ManifestPipeline;
use crate::storage::SqliteManifestStore;

pub fn test_state() -> (Arc<ManifestState>, Arc<SqliteManifestStore>) {
    test_state_with_timeout(Duration::from_secs(10))
}

/// Manifest state over an in-memory store and a fresh signing key. The
/// store is returned too so tests can inspect or stall it.
pub fn test_state_with_timeout(
    request_timeout: Duration,
) -> (Arc<ManifestState>, Arc<SqliteManifestStore>) {
    let store = Arc::new(SqliteManifestStore::in_memory().unwrap());
    let signer = Arc::new(DetachedSigner::from_base64(&generate_detached_key()).unwrap());
    let pipeline = ManifestPipeline::new(store.clone(), signer, Arc::new(SystemClock), "1.0.0");
    let state = ManifestState {
        pipeline,
        locales: LocaleResolver::default(),
        request_timeout,
    };
    (Arc::new(state), store)
}

pub fn create_body() -> serde_json::Value {
    json!({
        "author": {"name": "Ann", "email": "ann@example.com"},
        "category": "weather",
        "icon": "cloud",
        "tags": ["rain", "forecast"],
        "permissions": ["location"],
        "ui": {"components": [{"id": "map", "type": "map"}]},
        "script": {"code": "render()"},
        "localization": {
            "en": {"title": "Rain Radar", "description": "Live rain map"},
            "ja": {"title": "雨レーダー"}
        }
    })
}
