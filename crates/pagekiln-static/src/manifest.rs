//! Web app manifest generation.
//!
//! The engine describes the manifest with camelCase keys. The file on disk
//! follows the web app manifest spelling, drops nulls, and fills in the
//! defaults browsers need to treat the site as installable.

use serde_json::{Map, Value};

const KEY_RENAMES: &[(&str, &str)] = &[
    ("shortName", "short_name"),
    ("startUrl", "start_url"),
    ("backgroundColor", "background_color"),
    ("themeColor", "theme_color"),
    ("iarcRatingId", "iarc_rating_id"),
    ("serviceWorker", "serviceworker"),
    ("preferRelatedApplications", "prefer_related_applications"),
    ("relatedApplications", "related_applications"),
];

const DEFAULTS: &[(&str, &str)] = &[("start_url", "."), ("display", "standalone")];

/// Errors from manifest generation.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest must be a JSON object or a site name, got {0}")]
    InvalidShape(&'static str),
}

/// Transform engine manifest data into the on-disk manifest.
pub fn generate_manifest(source: &Value) -> Result<Value, ManifestError> {
    let fields = match source {
        Value::Object(fields) => fields.clone(),
        Value::String(name) => {
            let mut fields = Map::new();
            fields.insert("name".to_string(), Value::String(name.clone()));
            fields
        }
        Value::Null => return Err(ManifestError::InvalidShape("null")),
        Value::Bool(_) => return Err(ManifestError::InvalidShape("a boolean")),
        Value::Number(_) => return Err(ManifestError::InvalidShape("a number")),
        Value::Array(_) => return Err(ManifestError::InvalidShape("an array")),
    };

    let mut manifest = Map::new();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let key = KEY_RENAMES
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| to.to_string())
            .unwrap_or(key);
        manifest.insert(key, value);
    }

    for (key, default) in DEFAULTS {
        manifest
            .entry(key.to_string())
            .or_insert_with(|| Value::String(default.to_string()));
    }

    Ok(Value::Object(manifest))
}
