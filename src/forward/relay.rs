//! Response shaping for relayed and passed-through upstream responses.
//!
//! # Relay flavor
//! - Status passthrough, `Content-Type` defaulting to `application/json`
//! - JSON bodies re-serialized compactly when they parse
//! - Permissive CORS and cache-disabling headers on every response
//!
//! # Passthrough flavor
//! - Status, headers and body relayed unchanged, minus hop-by-hop headers

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Insert the CORS headers the relay advertises.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
}

/// Insert browser and CDN cache-disabling headers.
pub fn apply_no_cache(headers: &mut HeaderMap, cdn_headers: &[HeaderName]) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    for name in cdn_headers {
        headers.insert(name.clone(), HeaderValue::from_static("no-store"));
    }
}

/// Re-serialize a JSON body compactly; non-JSON bytes are returned as-is.
pub fn normalize_json(body: Bytes) -> Bytes {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(compact) => Bytes::from(compact),
            Err(_) => body,
        },
        Err(_) => body,
    }
}

/// Build the relay response from an upstream status, content type and body.
pub fn relay_response(
    status: StatusCode,
    content_type: Option<&HeaderValue>,
    body: Bytes,
    cdn_headers: &[HeaderName],
) -> Response {
    let content_type = content_type
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let is_json = content_type
        .to_str()
        .map(|ct| ct.contains(DEFAULT_CONTENT_TYPE))
        .unwrap_or(false);
    let body = if is_json { normalize_json(body) } else { body };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    apply_cors(headers);
    apply_no_cache(headers, cdn_headers);
    response
}

/// Answer a CORS preflight.
pub fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors(response.headers_mut());
    response
}

/// Reject a non-GET relay request.
pub fn method_not_allowed() -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Report an upstream failure to a relay caller.
pub fn proxy_error(message: &str) -> Response {
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Proxy error", "message": message })),
    )
        .into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Copy response headers, dropping hop-by-hop ones.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
