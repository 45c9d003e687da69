//! # Requester locale
//!
//! The locale is the primary language subtag of the highest-weighted
//! `Accept-Language` entry, lower-cased. Anything unusable resolves to `en`.

use std::collections::{BTreeMap, BTreeSet};

use pluto_types::LocalizationMap;

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, Default)]
pub struct LocaleResolver {
    /// `None` accepts any well-formed language subtag
    supported: Option<BTreeSet<String>>,
}

impl LocaleResolver {
    pub fn new(supported: Option<BTreeSet<String>>) -> Self {
        Self { supported }
    }

    pub fn resolve(&self, accept_language: Option<&str>) -> String {
        let Some(locale) = accept_language.and_then(primary_language) else {
            return DEFAULT_LOCALE.to_string();
        };
        match &self.supported {
            Some(set) if !set.contains(&locale) => DEFAULT_LOCALE.to_string(),
            _ => locale,
        }
    }
}

/// Primary subtag of the preferred entry. Ties keep header order; `q=0`
/// and `*` entries are skipped.
fn primary_language(header: &str) -> Option<String> {
    let mut best: Option<(f32, String)> = None;

    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let tag = parts.next().unwrap_or_default().trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }

        let mut weight = 1.0_f32;
        for param in parts {
            if let Some(q) = param.trim().strip_prefix("q=") {
                weight = match q.trim().parse::<f32>() {
                    Ok(w) if (0.0..=1.0).contains(&w) => w,
                    _ => 0.0,
                };
            }
        }
        if weight <= 0.0 {
            continue;
        }

        let Some(primary) = tag.split(['-', '_']).next() else {
            continue;
        };
        if !(2..=8).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            continue;
        }

        if best.as_ref().map_or(true, |(w, _)| weight > *w) {
            best = Some((weight, primary.to_ascii_lowercase()));
        }
    }

    best.map(|(_, locale)| locale)
}

/// Flatten to one key/value map for `locale`, taking each key from `locale`
/// when present and from `en` otherwise.
pub fn localize(localization: &LocalizationMap, locale: &str) -> BTreeMap<String, String> {
    let mut merged = localization
        .get(DEFAULT_LOCALE)
        .cloned()
        .unwrap_or_default();
    if locale != DEFAULT_LOCALE {
        if let Some(entries) = localization.get(locale) {
            merged.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    merged
}
