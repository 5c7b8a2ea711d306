//! URL helpers for building chat and backend endpoints.

/// Join a base URL and a path without doubling or dropping slashes.
///
/// # Examples
///
/// ```
/// use vastuchat::utils::url::join_endpoint;
///
/// assert_eq!(
///     join_endpoint("http://localhost:8000/", "/api/solvers/generate"),
///     "http://localhost:8000/api/solvers/generate"
/// );
/// ```
pub fn join_endpoint(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Join `path` onto `base_url` unless the base already ends with it.
///
/// Users paste either the server root or the full chat URL; both should work.
pub fn ensure_endpoint_path(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let suffix = format!("/{}", path.trim_start_matches('/'));
    if base.ends_with(&suffix) {
        base.to_string()
    } else {
        join_endpoint(base, path)
    }
}

/// Port of an endpoint URL, explicit or implied by its scheme.
pub fn endpoint_port(endpoint: &str) -> Option<u16> {
    reqwest::Url::parse(endpoint)
        .ok()
        .and_then(|url| url.port_or_known_default())
}
