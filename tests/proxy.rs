//! End-to-end tests: client → proxy → mock upstream.

use std::time::Duration;

use serde_json::Value;

use icd_proxy::client::{ClientError, IcdClient, Level};

mod common;

async fn json_body(res: reqwest::Response) -> Value {
    res.json().await.expect("json body")
}

#[tokio::test]
async fn test_relay_injects_browser_headers() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;

    let res = common::http_client()
        .get(proxy.url("/api/proxy/ICD10/root?lang=vi&_t=1700000000000"))
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    let headers = res.headers().clone();
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
    assert_eq!(headers["vercel-cdn-cache-control"], "no-store");
    assert!(headers.contains_key("x-request-id"));

    let text = res.text().await.unwrap();
    assert!(!text.contains('\n'), "relay should compact JSON: {text}");

    let echo: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/api/ICD10/root");
    assert_eq!(echo["query"], "lang=vi");
    assert_eq!(echo["headers"]["referer"], "https://icd.kcb.vn/");
    assert_eq!(echo["headers"]["cookie"], "NEXT_LOCALE=en");
    assert_eq!(echo["headers"]["sec-ch-ua-platform"], "\"Windows\"");
    assert!(echo["headers"]["user-agent"]
        .as_str()
        .unwrap()
        .contains("Chrome/144.0.0.0"));
    assert!(echo["headers"].get("x-client-ip").is_none());
}

#[tokio::test]
async fn test_relay_chapter_gets_client_ip() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;

    let client = IcdClient::with_client(common::http_client(), &proxy.url("/api/proxy"));
    let chapter = client.chapter("I").await.unwrap();
    assert!(chapter.is_success());
    assert_eq!(chapter.data.data.code, "I");
    assert_eq!(chapter.data.data.name, "42.114.35.89");

    // The relay sends its own header set; the section request's client-side
    // header is not forwarded and no rule matches.
    let section = client.section("S1").await.unwrap();
    assert_eq!(section.data.model, "section");
    assert_eq!(section.data.data.name, "");
}

#[tokio::test]
async fn test_relay_passes_status_and_content_type() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;
    let http = common::http_client();

    let res = http.get(proxy.url("/api/proxy/status/404")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let res = http.get(proxy.url("/api/proxy/html")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "<p>  chapter  </p>");

    let res = http.get(proxy.url("/api/proxy/untyped")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"a":1}"#);
}

#[tokio::test]
async fn test_relay_root_path_and_repeated_query() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;

    let res = common::http_client()
        .get(proxy.url("/api/proxy?path=x&id=1&id=2&lang="))
        .send()
        .await
        .unwrap();
    let echo = json_body(res).await;
    assert_eq!(echo["path"], "/api");
    assert_eq!(echo["query"], "id=1");
}

#[tokio::test]
async fn test_relay_upstream_unreachable() {
    // Bind and release a port so nothing is listening on it.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let proxy = common::start_proxy(common::config_for(closed)).await;

    let res = common::http_client()
        .get(proxy.url("/api/proxy/ICD10/root"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body = json_body(res).await;
    assert_eq!(body["error"], "Proxy error");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_upstream_timeout() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::config_for(upstream);
    config.upstream.timeout_secs = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::http_client()
        .get(proxy.url("/api/proxy/slow"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body = json_body(res).await;
    assert!(body["message"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_passthrough_forwards_verbatim() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;

    let res = common::http_client()
        .post(proxy.url("/api/ICD10/root?lang=vi&_t=1"))
        .header("x-custom", "kept")
        .header("user-agent", "curl/8.0")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(!res.headers().contains_key("access-control-allow-origin"));

    let text = res.text().await.unwrap();
    assert!(text.contains('\n'), "passthrough must not rewrite the body");

    let echo: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/api/ICD10/root");
    assert_eq!(echo["query"], "lang=vi&_t=1");
    assert_eq!(echo["body"], "hello");
    assert_eq!(echo["headers"]["x-custom"], "kept");
    assert!(echo["headers"]["user-agent"]
        .as_str()
        .unwrap()
        .starts_with("Mozilla/5.0"));
    assert!(echo["headers"].get("cookie").is_none());
}

#[tokio::test]
async fn test_passthrough_client_headers_and_rules() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;
    let client = IcdClient::with_client(common::http_client(), &proxy.url("/api"));

    // Rule matched against the inbound URL.
    let chapter = client.chapter("II").await.unwrap();
    assert_eq!(chapter.data.data.name, "42.114.35.89");

    // Header sent by the client itself is forwarded.
    let disease = client.node(Level::Disease, "A00.0").await.unwrap();
    assert!(disease.data.is_leaf);
    assert_eq!(disease.data.data.name, "42.114.35.89");

    let search = client.search("tả").await.unwrap();
    let query = search["query"].as_str().unwrap();
    assert!(query.starts_with("q=t%E1%BA%A3&lang=vi&_t="));
}

#[tokio::test]
async fn test_passthrough_upstream_unreachable() {
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let proxy = common::start_proxy(common::config_for(closed)).await;

    let res = common::http_client()
        .get(proxy.url("/api/ICD10/root"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn test_passthrough_upstream_timeout() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::config_for(upstream);
    config.upstream.timeout_secs = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::http_client()
        .get(proxy.url("/api/slow"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 504);
}

#[tokio::test]
async fn test_bare_relay_prefix_methods() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;
    let http = common::http_client();

    for path in ["/api/proxy", "/api/proxy/"] {
        let res = http
            .request(reqwest::Method::OPTIONS, proxy.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "OPTIONS {path}");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");

        let res = http.delete(proxy.url(path)).send().await.unwrap();
        assert_eq!(res.status(), 405, "DELETE {path}");
    }
}

#[tokio::test]
async fn test_client_reports_upstream_status() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;
    let client = IcdClient::with_client(common::http_client(), &proxy.url("/api/status/503"));

    match client.root().await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert!(body.contains("/api/status/503/ICD10/root"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reload_swaps_header_profile() {
    let upstream = common::start_mock_upstream().await;
    let config = common::config_for(upstream);
    let proxy = common::start_proxy(config.clone()).await;
    let http = common::http_client();

    let mut updated = config;
    updated
        .relay
        .profile
        .headers
        .insert("User-Agent".into(), "icd-proxy-test".into());
    proxy.config_updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let echo = json_body(http.get(proxy.url("/api/proxy/ICD10/root")).send().await.unwrap()).await;
    assert_eq!(echo["headers"]["user-agent"], "icd-proxy-test");
}

#[tokio::test]
async fn test_health() {
    let upstream = common::start_mock_upstream().await;
    let proxy = common::start_proxy(common::config_for(upstream)).await;

    let body = json_body(
        common::http_client()
            .get(proxy.url("/healthz"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["upstream"], format!("http://{upstream}"));
}
