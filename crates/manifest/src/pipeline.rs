//! # Manifest signing pipeline
//!
//! ## Create
//! 1. `localization.en` must carry `title` and `description`.
//! 2. The script envelope must be `{"code": "<string>"}`.
//! 3. Build the canonical payload (meta, permissions, script code, ui,
//!    actions) and sign it with the detached signer.
//! 4. Persist manifest, content and every localization in one transaction.
//!
//! Steps 1 and 2 run before any id is minted or anything is signed, so a
//! rejected request has no side effects.
//!
//! ## Read
//! `get`, `list` and `search` localize to the requester's locale with a
//! per-field fallback to `en`. `verify` rebuilds the canonical payload from
//! the stored rows and checks the stored signature.

use std::sync::Arc;

use pluto_core::{build_canonical_payload, CanonicalizationError, Clock, PayloadInput, PayloadMeta};
use pluto_crypto::DetachedSigner;
use pluto_types::{
    ListParams, ManifestCreate, ManifestCreateResponse, ManifestMeta, ManifestView,
    PublicKeyResponse, ScriptEnvelope, VerifyResponse,
};
use serde_json::Value;
use uuid::Uuid;

use crate::locale::{localize, DEFAULT_LOCALE};
use crate::storage::{ManifestStore, NewManifest, StoreError, StoredManifest};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;
pub const SEARCH_LIMIT: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
    #[error("manifest {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ManifestPipeline {
    store: Arc<dyn ManifestStore>,
    signer: Arc<DetachedSigner>,
    clock: Arc<dyn Clock>,
    version: String,
}

/// Require `localization.en.title` and `localization.en.description`.
fn validate_localization(req: &ManifestCreate) -> Result<(), PipelineError> {
    let en = req
        .localization
        .get(DEFAULT_LOCALE)
        .ok_or_else(|| PipelineError::Validation("localization must include 'en'".into()))?;
    for key in ["title", "description"] {
        if !en.contains_key(key) {
            return Err(PipelineError::Validation(format!(
                "localization 'en' must include '{key}'"
            )));
        }
    }
    Ok(())
}

/// The `code` string of a `{"code": ...}` script envelope.
fn extract_script_code(script: &Value) -> Result<String, PipelineError> {
    serde_json::from_value::<ScriptEnvelope>(script.clone())
        .map(|envelope| envelope.code)
        .map_err(|e| PipelineError::Validation(format!("script must be {{\"code\": string}}: {e}")))
}

impl ManifestPipeline {
    pub fn new(
        store: Arc<dyn ManifestStore>,
        signer: Arc<DetachedSigner>,
        clock: Arc<dyn Clock>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            signer,
            clock,
            version: version.into(),
        }
    }

    pub async fn create(
        &self,
        req: ManifestCreate,
    ) -> Result<ManifestCreateResponse, PipelineError> {
        validate_localization(&req)?;
        let script_code = extract_script_code(&req.script)?;

        let id = Uuid::now_v7();
        let payload = build_canonical_payload(&PayloadInput {
            meta: PayloadMeta {
                id,
                version: &self.version,
                author: &req.author,
                category: &req.category,
                icon: &req.icon,
                tags: &req.tags,
            },
            permissions: &req.permissions,
            script_code: &script_code,
            ui: &req.ui,
            actions: req.actions.as_deref(),
        })?;
        let signature = self.signer.sign(&payload);

        let locales = req.localization.len();
        self.store
            .insert(NewManifest {
                id,
                version: self.version.clone(),
                icon: req.icon,
                category: req.category,
                tags: req.tags,
                author: req.author,
                signature,
                created_at: self.clock.now(),
                ui: req.ui,
                script_code,
                actions: req.actions,
                permissions: req.permissions,
                localization: req.localization,
            })
            .await?;

        tracing::info!(
            manifest_id = %id,
            payload_bytes = payload.len(),
            locales,
            "manifest signed and stored"
        );
        Ok(ManifestCreateResponse { id })
    }

    pub async fn get(&self, id: Uuid, locale: &str) -> Result<ManifestView, PipelineError> {
        let stored = self
            .store
            .get(id, locale)
            .await?
            .ok_or(PipelineError::NotFound(id))?;
        Ok(into_view(stored, locale))
    }

    pub async fn list(
        &self,
        params: &ListParams,
        locale: &str,
    ) -> Result<Vec<ManifestMeta>, PipelineError> {
        let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = params.offset.unwrap_or(0);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(PipelineError::Validation(format!(
                "limit must be between 1 and {MAX_LIST_LIMIT}"
            )));
        }
        if offset < 0 {
            return Err(PipelineError::Validation("offset must not be negative".into()));
        }
        Ok(self.store.list(limit, offset, locale).await?)
    }

    pub async fn search(
        &self,
        query: &str,
        locale: &str,
    ) -> Result<Vec<ManifestMeta>, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::Validation("query must not be empty".into()));
        }
        Ok(self.store.search(query, locale, SEARCH_LIMIT).await?)
    }

    /// Whether the stored signature matches the stored content.
    pub async fn verify(&self, id: Uuid) -> Result<VerifyResponse, PipelineError> {
        let view = self.get(id, DEFAULT_LOCALE).await?;
        let payload = build_canonical_payload(&PayloadInput::from(&view))?;
        let valid = self.signer.verify(&payload, &view.signature).is_ok();
        if !valid {
            tracing::warn!(manifest_id = %id, "stored manifest signature does not verify");
        }
        Ok(VerifyResponse { id, valid })
    }

    pub fn public_key(&self) -> PublicKeyResponse {
        PublicKeyResponse {
            public_key: self.signer.public_key(),
        }
    }
}

fn into_view(stored: StoredManifest, locale: &str) -> ManifestView {
    let localization = localize(&stored.localization, locale);
    let field = |key: &str| localization.get(key).cloned().unwrap_or_default();
    let meta = ManifestMeta {
        id: stored.id,
        version: stored.version,
        icon: stored.icon,
        category: stored.category,
        tags: stored.tags,
        author: stored.author,
        created_at: stored.created_at,
        title: field("title"),
        description: field("description"),
    };
    ManifestView {
        meta,
        localization,
        ui: stored.ui,
        script: ScriptEnvelope {
            code: stored.script_code,
        },
        actions: stored.actions,
        permissions: stored.permissions,
        signature: stored.signature,
    }
}

#[cfg(test)]
mod tests {
    use pluto_core::ManualClock;
    use pluto_crypto::generate_detached_key;
    use serde_json::json;

    use super::*;
    use crate::storage::SqliteManifestStore;

    struct Fixture {
        pipeline: ManifestPipeline,
        store: Arc<SqliteManifestStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(SqliteManifestStore::in_memory().unwrap());
        let signer = Arc::new(DetachedSigner::from_base64(&generate_detached_key()).unwrap());
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let pipeline = ManifestPipeline::new(store.clone(), signer, clock.clone(), "1.0.0");
        Fixture {
            pipeline,
            store,
            clock,
        }
    }

    fn create_request() -> ManifestCreate {
        serde_json::from_value(json!({
            "author": {"name": "Ann", "email": "ann@example.com"},
            "category": "weather",
            "icon": "cloud",
            "tags": ["rain", "forecast"],
            "permissions": ["location", "network"],
            "ui": {
                "layout": {"type": "column", "children": [{"ref": "b"}, {"ref": "a"}]},
                "components": [
                    {"id": "b", "type": "button", "actions": [{"onTap": "refresh"}, {"onTap": "close"}]},
                    {"id": "a", "type": "label", "text": "Now"}
                ]
            },
            "script": {"code": "function refresh() {}"},
            "actions": [{"id": "refresh", "kind": "script"}, {"id": "close", "kind": "nav"}],
            "localization": {
                "en": {"title": "Rain Radar", "description": "Live rain map"},
                "ja": {"title": "雨レーダー"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_and_verify() {
        let f = fixture();
        let created = f.pipeline.create(create_request()).await.unwrap();

        let view = f.pipeline.get(created.id, "en").await.unwrap();
        assert_eq!(view.meta.version, "1.0.0");
        assert_eq!(view.meta.title, "Rain Radar");
        assert_eq!(view.meta.created_at, f.clock.now());
        assert_eq!(view.meta.tags, vec!["rain", "forecast"]);
        assert_eq!(view.script.code, "function refresh() {}");

        assert!(f.pipeline.verify(created.id).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_view_rebuilds_signed_bytes() {
        let f = fixture();
        let created = f.pipeline.create(create_request()).await.unwrap();
        let view = f.pipeline.get(created.id, "ja").await.unwrap();

        let payload = build_canonical_payload(&PayloadInput::from(&view)).unwrap();
        let public_key = f.pipeline.public_key().public_key;
        assert!(pluto_crypto::verify_detached(&public_key, &payload, &view.signature).is_ok());
    }

    #[tokio::test]
    async fn test_equivalent_requests_sign_identically() {
        let f = fixture();
        let a = create_request();
        let mut b = create_request();
        b.actions.as_mut().unwrap().reverse();
        if let Some(components) = b.ui["components"].as_array_mut() {
            components.reverse();
        }

        let id = Uuid::now_v7();
        let payload = |req: &ManifestCreate| {
            build_canonical_payload(&PayloadInput {
                meta: PayloadMeta {
                    id,
                    version: "1.0.0",
                    author: &req.author,
                    category: &req.category,
                    icon: &req.icon,
                    tags: &req.tags,
                },
                permissions: &req.permissions,
                script_code: "function refresh() {}",
                ui: &req.ui,
                actions: req.actions.as_deref(),
            })
            .unwrap()
        };
        let signer = DetachedSigner::from_base64(&generate_detached_key()).unwrap();
        assert_eq!(signer.sign(&payload(&a)), signer.sign(&payload(&b)));

        // the stored copy keeps caller order and still verifies
        let created = f.pipeline.create(b).await.unwrap();
        assert!(f.pipeline.verify(created.id).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_missing_en_fields_rejected_without_side_effects() {
        let f = fixture();

        let mut no_title = create_request();
        no_title.localization.get_mut("en").unwrap().remove("title");
        let mut no_description = create_request();
        no_description
            .localization
            .get_mut("en")
            .unwrap()
            .remove("description");
        let mut no_en = create_request();
        no_en.localization.remove("en");

        for req in [no_title, no_description, no_en] {
            let result = f.pipeline.create(req).await;
            assert!(matches!(result, Err(PipelineError::Validation(_))));
        }
        assert_eq!(f.store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_bad_script_envelope_rejected() {
        let f = fixture();
        for script in [json!("raw code"), json!({"source": "x"}), json!({"code": 7})] {
            let mut req = create_request();
            req.script = script;
            let result = f.pipeline.create(req).await;
            assert!(matches!(result, Err(PipelineError::Validation(_))));
        }
        assert_eq!(f.store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_action_without_id_rejected() {
        let f = fixture();
        let mut req = create_request();
        req.actions = Some(vec![json!({"kind": "nav"})]);
        let result = f.pipeline.create(req).await;
        assert!(matches!(result, Err(PipelineError::Canonicalization(_))));
        assert_eq!(f.store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_localization_failure_rolls_back() {
        let f = fixture();
        f.store
            .execute_for_test(
                "CREATE TRIGGER reject_localization BEFORE INSERT ON localizations
                 BEGIN SELECT RAISE(ABORT, 'localization rejected'); END;",
            )
            .await;

        let result = f.pipeline.create(create_request()).await;
        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert_eq!(f.store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_get_localizes_per_field() {
        let f = fixture();
        let created = f.pipeline.create(create_request()).await.unwrap();

        let ja = f.pipeline.get(created.id, "ja").await.unwrap();
        assert_eq!(ja.meta.title, "雨レーダー");
        assert_eq!(ja.meta.description, "Live rain map");
        assert_eq!(ja.localization["title"], "雨レーダー");

        let de = f.pipeline.get(created.id, "de").await.unwrap();
        assert_eq!(de.meta.title, "Rain Radar");
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let f = fixture();
        let result = f.pipeline.get(Uuid::now_v7(), "en").await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_tampered_row_fails_verification() {
        let f = fixture();
        let created = f.pipeline.create(create_request()).await.unwrap();
        f.store
            .execute_for_test("UPDATE manifests SET tags = '[\"forecast\",\"rain\"]'")
            .await;
        assert!(!f.pipeline.verify(created.id).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_list_params_validated() {
        let f = fixture();
        for (limit, offset) in [(Some(0), None), (Some(501), None), (None, Some(-1))] {
            let result = f
                .pipeline
                .list(&ListParams { limit, offset }, "en")
                .await;
            assert!(matches!(result, Err(PipelineError::Validation(_))));
        }
        assert!(f
            .pipeline
            .list(&ListParams::default(), "en")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let f = fixture();
        let first = f.pipeline.create(create_request()).await.unwrap();
        f.clock.advance(10);
        let second = f.pipeline.create(create_request()).await.unwrap();

        let metas = f.pipeline.list(&ListParams::default(), "en").await.unwrap();
        let ids: Vec<_> = metas.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_search() {
        let f = fixture();
        f.pipeline.create(create_request()).await.unwrap();

        assert_eq!(f.pipeline.search("RAIN map", "en").await.unwrap().len(), 1);
        assert_eq!(f.pipeline.search("レーダー", "ja").await.unwrap().len(), 1);
        assert!(f.pipeline.search("snow", "en").await.unwrap().is_empty());
        assert!(matches!(
            f.pipeline.search("   ", "en").await,
            Err(PipelineError::Validation(_))
        ));
    }
}
