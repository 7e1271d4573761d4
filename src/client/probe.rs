//! Endpoint probing for discovering which upstream paths answer.
//!
//! Probes never fail: transport errors are captured in the result so a sweep
//! over many candidates always completes.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROBE_DELAY: Duration = Duration::from_millis(100);

/// Bases tried by [`discover`] when none are given.
pub const DEFAULT_BASES: [&str; 5] = [
    "https://icd.kcb.vn",
    "https://icd.kcb.vn/api",
    "https://icd.kcb.vn/icd-10",
    "https://icd.kcb.vn/icd-10/api",
    "https://icd.kcb.vn/api/v1",
];

/// Endpoints tried against every base.
pub const DEFAULT_ENDPOINTS: [&str; 12] = [
    "/icd10/search",
    "/icd10/code",
    "/api/icd10/search",
    "/api/icd10/code",
    "/api/v1/icd10/search",
    "/api/v1/icd10/code",
    "/search",
    "/code",
    "/api/search",
    "/api/code",
    "/icd-10/search",
    "/icd-10/code",
];

/// Search endpoints tried by [`search_probe`], in order.
pub const SEARCH_ENDPOINTS: [&str; 4] = ["/icd10/search", "/api/icd10/search", "/search", "/api/search"];

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub status: Option<u16>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Client preconfigured with the probe timeout.
pub fn probe_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()
}

/// GET `{base}{endpoint}` and report what came back.
pub async fn probe_endpoint(client: &reqwest::Client, base: &str, endpoint: &str) -> ProbeResult {
    let url = format!("{base}{endpoint}");
    probe_url(client, url, &[]).await
}

async fn probe_url(client: &reqwest::Client, url: String, query: &[(&str, &str)]) -> ProbeResult {
    match client.get(&url).query(query).send().await {
        Ok(response) => {
            let status = response.status();
            let data = match response.text().await {
                Ok(text) => Some(serde_json::from_str(&text).unwrap_or(Value::String(text))),
                Err(_) => None,
            };
            ProbeResult {
                url,
                status: Some(status.as_u16()),
                success: status.is_success(),
                error: None,
                data,
            }
        }
        Err(e) => ProbeResult {
            url,
            status: None,
            success: false,
            error: Some(e.to_string()),
            data: None,
        },
    }
}

/// Probe every base × endpoint pair in order, pausing `delay` between
/// probes, and keep only the ones that answered 2xx.
pub async fn discover(
    client: &reqwest::Client,
    bases: &[&str],
    endpoints: &[&str],
    delay: Duration,
) -> Vec<ProbeResult> {
    let mut working = Vec::new();
    for base in bases {
        for endpoint in endpoints {
            let result = probe_endpoint(client, base, endpoint).await;
            tracing::debug!(url = %result.url, status = ?result.status, "Probed endpoint");
            if result.success {
                working.push(result);
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
    working
}

/// Try the search endpoints with the query under every common parameter
/// name; return the first 2xx.
pub async fn search_probe(client: &reqwest::Client, base: &str, query: &str) -> Option<ProbeResult> {
    let params = [("q", query), ("code", query), ("keyword", query)];
    for endpoint in SEARCH_ENDPOINTS {
        let result = probe_url(client, format!("{base}{endpoint}"), &params).await;
        if result.success {
            return Some(result);
        }
    }
    None
}
