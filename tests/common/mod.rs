//! Shared utilities for integration testing.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use icd_proxy::config::ProxyConfig;
use icd_proxy::{HttpServer, Shutdown};

/// Start a mock upstream on an ephemeral port.
///
/// Every request is answered with a JSON echo of what arrived:
/// `{"method", "path", "query", "headers", "body"}`. A few paths behave
/// differently:
/// - `/api/html` answers `text/html`
/// - `/api/untyped` answers with no content type
/// - `/api/status/{code}/...` answers with that status
/// - `/api/slow` sleeps for 3 seconds first
/// - `/api/ICD10/data/{level}?id=..` answers with a node whose `name` is the
///   `x-client-ip` header the upstream received
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_string();

    if path == "/api/html" {
        return (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<p>  chapter  </p>",
        )
            .into_response();
    }
    if path == "/api/untyped" {
        let mut response = Response::new(axum::body::Body::from("{ \"a\" : 1 }"));
        response.headers_mut().remove(header::CONTENT_TYPE);
        return response;
    }
    if path == "/api/slow" {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    if let Some(level) = path.strip_prefix("/api/ICD10/data/") {
        return node(level, uri.query(), &headers);
    }

    let status = path
        .strip_prefix("/api/status/")
        .and_then(|rest| rest.split('/').next())
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();

    let echo = json!({
        "method": method.as_str(),
        "path": path,
        "query": uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });

    // Pretty-printed so the relay's compaction is observable.
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::to_string_pretty(&echo).unwrap(),
    )
        .into_response()
}

fn node(level: &str, query: Option<&str>, headers: &HeaderMap) -> Response {
    let id = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    let client_ip = headers
        .get("x-client-ip")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    axum::Json(json!({
        "status": "success",
        "data": {
            "model": level,
            "id": id,
            "is_leaf": level == "disease",
            "data": { "code": id, "id": id, "name": client_ip, "html": null }
        }
    }))
    .into_response()
}

/// A config pointing both proxy flavors at `upstream`.
pub fn config_for(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = format!("http://{upstream}");
    config.upstream.system_proxy = false;
    config
}

/// A running proxy and the handles needed to drive and stop it.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<ProxyConfig>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    RunningProxy {
        addr,
        shutdown,
        config_updates,
    }
}

/// Client that ignores system proxy settings.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
