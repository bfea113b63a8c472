//! Text rewrites applied to compiled bundles.
//!
//! The compiler emits a classic script that attaches its exports to `this`.
//! Two rewrites make its output usable by the rest of the build:
//!
//! - [`to_esm_module`] turns the client bundle into an ES module so the page
//!   template can load it with `<script type="module">`.
//! - [`inline_json_stringify`] neutralises the placeholder encoder call in the
//!   engine bundle so page data crosses the process boundary as raw values.
//!
//! Both are pure `&str -> String` functions; [`rewrite_in_place`] applies one
//! to a file on disk.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Marker closing the compiler's scope wrapper.
const SCOPE_MARKER: &str = "}(this));";

static JSON_STRINGIFY_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"return \$elm\$json\$Json\$Encode\$string\(.REPLACE_ME_WITH_JSON_STRINGIFY.\)")
        .expect("placeholder pattern is valid")
});

/// Errors from bundle rewriting.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Bundle has no '{}' scope marker", SCOPE_MARKER)]
    MissingScopeMarker,

    #[error("Failed to read bundle {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write bundle {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Wrap a scope-assigning bundle as an ES module exporting `export_name`.
pub fn to_esm_module(source: &str, export_name: &str) -> Result<String, BundleError> {
    if !source.contains(SCOPE_MARKER) {
        return Err(BundleError::MissingScopeMarker);
    }

    Ok(format!(
        "\nconst scope = {{}};\n{}export const {{ {} }} = scope;\n\n",
        source.replacen(SCOPE_MARKER, "}(scope));", 1),
        export_name
    ))
}

/// Replace every JSON-stringify placeholder call with a bare `return x`.
pub fn inline_json_stringify(source: &str) -> String {
    JSON_STRINGIFY_PLACEHOLDER
        .replace_all(source, "return x")
        .into_owned()
}

/// Read `path`, apply `rewrite`, and write the result back.
pub async fn rewrite_in_place<F>(path: &Path, rewrite: F) -> Result<(), BundleError>
where
    F: FnOnce(&str) -> Result<String, BundleError>,
{
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BundleError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let rewritten = rewrite(&source)?;

    tokio::fs::write(path, rewritten)
        .await
        .map_err(|source| BundleError::Write {
            path: path.display().to_string(),
            source,
        })?;

    tracing::debug!("Rewrote {}", path.display());
    Ok(())
}
