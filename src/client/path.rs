//! Resource path formatting for the search backend.

/// Root path segment every backend resource lives under.
pub const ROOT_SEGMENT: &str = "solr";

/// Returns the backend root (`<uri>/solr`), tolerating a URI that already
/// ends in the root segment or carries a trailing slash.
pub fn backend_root(uri: &str) -> String {
    let uri = uri.trim_end_matches('/');
    let suffix = format!("/{}", ROOT_SEGMENT);
    if uri.ends_with(&suffix) {
        uri.to_string()
    } else {
        format!("{}{}", uri, suffix)
    }
}

/// Canonical path of a named collection: `<uri>/solr/<name>`.
pub fn format_base_path(uri: &str, name: &str) -> String {
    format!("{}/{}", backend_root(uri), name)
}
