//! # Canonical JSON
//!
//! Encoding rules:
//! - RFC 8785 (JCS): object keys sorted by UTF-16 code units at every level,
//!   no insignificant whitespace, numbers in ECMAScript shortest form
//!   (`1`, `1.0` and `1e0` all encode as `1`).
//! - Arrays keep caller order unless they are an identity-keyed collection:
//!   top-level `actions` by `id`, `ui.components` by `id`, and each
//!   component's `actions` by `onTap`. Equal identities are ordered by the
//!   member's own canonical bytes.
//! - A member without a string identity field is rejected.

use serde_json::Value;

use crate::CanonicalizationError;

/// Canonical bytes of any JSON value. Arrays keep their order.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    serde_jcs::to_vec(value).map_err(|e| CanonicalizationError::Encode(e.to_string()))
}

/// Parse a raw JSON fragment and canonicalize it.
pub fn canonicalize_str(raw: &str) -> Result<Vec<u8>, CanonicalizationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CanonicalizationError::Malformed(e.to_string()))?;
    canonicalize(&value)
}

/// Stable sort of `items` by the string field `field`.
fn sort_by_identity(
    items: &[Value],
    field: &'static str,
    collection: &str,
) -> Result<Vec<Value>, CanonicalizationError> {
    let mut keyed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let identity = item
            .as_object()
            .and_then(|obj| obj.get(field))
            .ok_or_else(|| CanonicalizationError::MissingIdentity {
                collection: collection.to_string(),
                index,
                field,
            })?
            .as_str()
            .ok_or_else(|| CanonicalizationError::NonStringIdentity {
                collection: collection.to_string(),
                index,
                field,
            })?
            .to_string();
        let tiebreak = canonicalize(item)?;
        keyed.push((identity, tiebreak, item));
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(keyed.into_iter().map(|(_, _, item)| item.clone()).collect())
}

/// Identity-sort the top-level action list.
pub fn canonical_actions(actions: &[Value]) -> Result<Vec<Value>, CanonicalizationError> {
    sort_by_identity(actions, "id", "actions")
}

/// Identity-sort `ui.components` and every component's `actions`.
///
/// Everything else in the ui tree, including `layout.children`, keeps caller
/// order. A ui value that is not an object is returned unchanged.
pub fn canonical_ui(ui: &Value) -> Result<Value, CanonicalizationError> {
    let mut ui = ui.clone();
    if let Some(components) = ui.as_object_mut().and_then(|obj| obj.get_mut("components")) {
        let list = components.as_array().ok_or_else(|| {
            CanonicalizationError::Malformed("ui.components must be an array".into())
        })?;

        let mut normalized = Vec::with_capacity(list.len());
        for (index, component) in list.iter().enumerate() {
            let mut component = component.clone();
            if let Some(actions) = component
                .as_object_mut()
                .and_then(|obj| obj.get_mut("actions"))
            {
                let collection = format!("ui.components[{index}].actions");
                let sorted = match actions.as_array() {
                    Some(items) => sort_by_identity(items, "onTap", &collection)?,
                    None => {
                        return Err(CanonicalizationError::Malformed(format!(
                            "{collection} must be an array"
                        )))
                    }
                };
                *actions = Value::Array(sorted);
            }
            normalized.push(component);
        }

        *components = Value::Array(sort_by_identity(&normalized, "id", "ui.components")?);
    }
    Ok(ui)
}
