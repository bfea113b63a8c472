//! Route normalization.
//!
//! Routes arrive from the engine as logical URL paths (`/blog/post-1/`,
//! `about/index`, `""`). These helpers turn them into output directories and
//! into the relative prefix that points from a page back to the output root.

/// Strip at most one leading and one trailing `/`.
///
/// Only one slash is removed from each side, so this is idempotent for
/// routes without doubled edge slashes: `//a//` cleans to `/a/`, then `a`.
/// Such routes are later rejected by [`validate_output_route`].
pub fn clean_route(route: &str) -> &str {
    let route = route.strip_prefix('/').unwrap_or(route);
    route.strip_suffix('/').unwrap_or(route)
}

/// Relative prefix from a directory at `cleaned_route` back to the root.
///
/// One `../` per segment; the empty route is the root itself.
pub fn path_to_root(cleaned_route: &str) -> String {
    if cleaned_route.is_empty() {
        return String::new();
    }

    let mut prefix = cleaned_route
        .split('/')
        .map(|_| "..")
        .collect::<Vec<_>>()
        .join("/");

    if prefix.ends_with('.') {
        prefix.push('/');
    }

    prefix
}

/// Value for the document's `<base href>`.
pub fn base_route(route: &str) -> String {
    let cleaned = clean_route(route);
    if cleaned.is_empty() {
        "./".to_string()
    } else {
        path_to_root(cleaned)
    }
}

/// Directory (relative to the output root) a route is written to.
///
/// A trailing `index` segment is dropped, so `about/index` and `about`
/// share a directory.
pub fn output_route(route: &str) -> &str {
    let cleaned = clean_route(route);
    if cleaned == "index" {
        return "";
    }
    cleaned.strip_suffix("/index").unwrap_or(cleaned)
}

/// Reasons a route cannot be mapped to an output directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route /{0} contains an empty segment")]
    EmptySegment(String),

    #[error("route /{0} contains a relative segment")]
    RelativeSegment(String),

    #[error("route /{0} contains a backslash")]
    Backslash(String),
}

/// Check that an output route stays inside the output root.
pub fn validate_output_route(route: &str) -> Result<(), RouteError> {
    if route.is_empty() {
        return Ok(());
    }
    if route.contains('\\') {
        return Err(RouteError::Backslash(route.to_string()));
    }
    for segment in route.split('/') {
        match segment {
            "" => return Err(RouteError::EmptySegment(route.to_string())),
            "." | ".." => return Err(RouteError::RelativeSegment(route.to_string())),
            _ => {}
        }
    }
    Ok(())
}
