//! # Canonical manifest payload
//!
//! Layout of the signed bytes (keys shown sorted, as encoded):
//!
//! ```text
//! {"actions":[..],            omitted when absent or empty
//!  "meta":{"author":{"email","name"},"category","icon","id","tags":[..],"version"},
//!  "permissions":[..],
//!  "script":{"code":".."},
//!  "ui":{..}}
//! ```
//!
//! `tags` and `permissions` keep caller order. A verifier rebuilds the same
//! bytes from a [`ManifestView`] via `PayloadInput::from`.

use pluto_types::{Author, ManifestView};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::canonical::{canonical_actions, canonical_ui, canonicalize};
use crate::CanonicalizationError;

/// Signed manifest metadata.
#[derive(Debug, Clone, Copy)]
pub struct PayloadMeta<'a> {
    pub id: Uuid,
    pub version: &'a str,
    pub author: &'a Author,
    pub category: &'a str,
    pub icon: &'a str,
    pub tags: &'a [String],
}

/// Everything covered by a manifest signature.
#[derive(Debug, Clone, Copy)]
pub struct PayloadInput<'a> {
    pub meta: PayloadMeta<'a>,
    pub permissions: &'a [String],
    pub script_code: &'a str,
    pub ui: &'a Value,
    pub actions: Option<&'a [Value]>,
}

/// Build the canonical payload bytes.
pub fn build_canonical_payload(input: &PayloadInput<'_>) -> Result<Vec<u8>, CanonicalizationError> {
    let meta = &input.meta;
    let mut payload = Map::new();
    payload.insert(
        "meta".to_string(),
        json!({
            "id": meta.id.to_string(),
            "version": meta.version,
            "author": {
                "name": meta.author.name,
                "email": meta.author.email,
            },
            "category": meta.category,
            "icon": meta.icon,
            "tags": meta.tags,
        }),
    );
    payload.insert("permissions".to_string(), json!(input.permissions));
    payload.insert("script".to_string(), json!({ "code": input.script_code }));
    payload.insert("ui".to_string(), canonical_ui(input.ui)?);

    if let Some(actions) = input.actions.filter(|actions| !actions.is_empty()) {
        payload.insert(
            "actions".to_string(),
            Value::Array(canonical_actions(actions)?),
        );
    }

    canonicalize(&Value::Object(payload))
}

impl<'a> From<&'a ManifestView> for PayloadInput<'a> {
    fn from(view: &'a ManifestView) -> Self {
        PayloadInput {
            meta: PayloadMeta {
                id: view.meta.id,
                version: &view.meta.version,
                author: &view.meta.author,
                category: &view.meta.category,
                icon: &view.meta.icon,
                tags: &view.meta.tags,
            },
            permissions: &view.permissions,
            script_code: &view.script.code,
            ui: &view.ui,
            actions: view.actions.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author {
            name: "Ann".into(),
            email: "ann@example.com".into(),
        }
    }

    fn input<'a>(
        author: &'a Author,
        tags: &'a [String],
        permissions: &'a [String],
        ui: &'a Value,
        actions: Option<&'a [Value]>,
    ) -> PayloadInput<'a> {
        PayloadInput {
            meta: PayloadMeta {
                id: Uuid::nil(),
                version: "1.0.0",
                author,
                category: "tools",
                icon: "star",
                tags,
            },
            permissions,
            script_code: "main()",
            ui,
            actions,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_payload_layout() {
        let author = author();
        let tags = strings(&["t1"]);
        let perms = strings(&["camera"]);
        let ui = json!({"components": []});
        let bytes = build_canonical_payload(&input(&author, &tags, &perms, &ui, None)).unwrap();

        let expected = concat!(
            r#"{"meta":{"author":{"email":"ann@example.com","name":"Ann"},"category":"tools","#,
            r#""icon":"star","id":"00000000-0000-0000-0000-000000000000","tags":["t1"],"#,
            r#""version":"1.0.0"},"permissions":["camera"],"script":{"code":"main()"},"#,
            r#""ui":{"components":[]}}"#,
        );
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), expected);
    }

    #[test]
    fn test_absent_and_empty_actions_omitted() {
        let author = author();
        let tags = strings(&[]);
        let perms = strings(&[]);
        let ui = json!({});
        let none = build_canonical_payload(&input(&author, &tags, &perms, &ui, None)).unwrap();
        let empty = build_canonical_payload(&input(&author, &tags, &perms, &ui, Some(&[][..]))).unwrap();

        assert_eq!(none, empty);
        let text = String::from_utf8(none).unwrap();
        assert!(!text.contains("actions"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_unordered_collections_do_not_change_bytes() {
        let author = author();
        let tags = strings(&["a", "b"]);
        let perms = strings(&["camera", "gps"]);
        let ui_a = json!({"components": [{"id": "c1", "x": 1}, {"id": "c2"}], "theme": "dark"});
        let ui_b = json!({"theme": "dark", "components": [{"id": "c2"}, {"x": 1, "id": "c1"}]});
        let actions_a = vec![json!({"id": "open"}), json!({"id": "close"})];
        let actions_b = vec![json!({"id": "close"}), json!({"id": "open"})];

        let a = build_canonical_payload(&input(&author, &tags, &perms, &ui_a, Some(actions_a.as_slice()))).unwrap();
        let b = build_canonical_payload(&input(&author, &tags, &perms, &ui_b, Some(actions_b.as_slice()))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tag_and_permission_order_is_significant() {
        let author = author();
        let ui = json!({});
        let perms = strings(&["camera", "gps"]);

        let tags_ab = strings(&["a", "b"]);
        let tags_ba = strings(&["b", "a"]);
        let x = build_canonical_payload(&input(&author, &tags_ab, &perms, &ui, None)).unwrap();
        let y = build_canonical_payload(&input(&author, &tags_ba, &perms, &ui, None)).unwrap();
        assert_ne!(x, y);

        let perms_rev = strings(&["gps", "camera"]);
        let z = build_canonical_payload(&input(&author, &tags_ab, &perms_rev, &ui, None)).unwrap();
        assert_ne!(x, z);
    }

    #[test]
    fn test_duplicate_tags_preserved() {
        let author = author();
        let ui = json!({});
        let perms = strings(&[]);
        let tags = strings(&["a", "a"]);
        let bytes = build_canonical_payload(&input(&author, &tags, &perms, &ui, None)).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains(r#""tags":["a","a"]"#));
    }

    #[test]
    fn test_payload_is_canonical_fixpoint() {
        let author = author();
        let tags = strings(&["z", "y"]);
        let perms = strings(&["net"]);
        let ui = json!({"components": [{"id": "b"}, {"id": "a"}], "n": 1.0});
        let actions = vec![json!({"id": "2"}), json!({"id": "1"})];
        let bytes = build_canonical_payload(&input(&author, &tags, &perms, &ui, Some(actions.as_slice()))).unwrap();
        let again = crate::canonicalize_str(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_action_without_identity_fails_whole_payload() {
        let author = author();
        let tags = strings(&[]);
        let perms = strings(&[]);
        let ui = json!({});
        let actions = vec![json!({"label": "x"})];
        let result = build_canonical_payload(&input(&author, &tags, &perms, &ui, Some(actions.as_slice())));
        assert!(matches!(
            result,
            Err(CanonicalizationError::MissingIdentity { .. })
        ));
    }
}
