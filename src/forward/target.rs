//! Upstream URL construction.
//!
//! Two shapes are supported:
//! - relay: `/api/proxy/ICD10/root?lang=vi&_t=1` → `{base}{api_prefix}/ICD10/root?lang=vi`
//!   (segments re-joined, internal and empty query parameters dropped)
//! - passthrough: `/api/ICD10/root?lang=vi&_t=1` → `{base}{api_prefix}/ICD10/root?lang=vi&_t=1`
//!   (path and query copied verbatim)

use url::form_urlencoded;

/// Strip `route_prefix` from `request_path` and re-join the remaining segments.
///
/// Returns an empty string when nothing but the prefix (or a bare `/`) remains,
/// so the target falls back to the API root.
pub fn relay_api_path(request_path: &str, route_prefix: &str) -> String {
    let rest = request_path.strip_prefix(route_prefix).unwrap_or(request_path);
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Rebuild the query string for a relayed request.
///
/// Keys listed in `strip` are dropped. A repeated key keeps only its first
/// value; a key given once with an empty value is dropped. Key order is
/// first appearance.
pub fn relay_query(raw_query: Option<&str>, strip: &[String]) -> String {
    let Some(raw) = raw_query else {
        return String::new();
    };

    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => grouped.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &grouped {
        if strip.contains(key) {
            continue;
        }
        if values.len() == 1 && values[0].is_empty() {
            continue;
        }
        serializer.append_pair(key, &values[0]);
    }
    serializer.finish()
}

/// Join base, API prefix, path and an optional query.
pub fn join_target(base_url: &str, api_prefix: &str, path: &str, query: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if query.is_empty() {
        format!("{base}{api_prefix}{path}")
    } else {
        format!("{base}{api_prefix}{path}?{query}")
    }
}

/// Target for the development passthrough: the part of the path after
/// `route_prefix` and the raw query are appended unchanged.
pub fn passthrough_target(
    base_url: &str,
    api_prefix: &str,
    request_path: &str,
    route_prefix: &str,
    raw_query: Option<&str>,
) -> String {
    let rest = request_path.strip_prefix(route_prefix).unwrap_or(request_path);
    join_target(base_url, api_prefix, rest, raw_query.unwrap_or(""))
}
