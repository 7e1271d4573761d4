//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every default reproduces the behavior of the upstream-facing deployment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_UPSTREAM: &str = "https://ccs.whiteneuron.com";
pub const CHAPTER_DATA_PATH: &str = "/ICD10/data/chapter";
pub const CLIENT_IP: &str = "42.114.35.89";

const ACCEPT: &str = "application/json, text/plain, */*";
const REFERER: &str = "https://icd.kcb.vn/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";
const SEC_CH_UA: &str = r#""Not(A:Brand";v="8", "Chromium";v="144", "Google Chrome";v="144""#;
const SEC_CH_UA_PLATFORM: &str = r#""Windows""#;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream API location.
    pub upstream: UpstreamConfig,

    /// Serverless-style relay under `/api/proxy`.
    pub relay: RelayConfig,

    /// Development-server style passthrough under `/api`.
    pub dev_proxy: DevProxyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and host of the upstream (no trailing slash).
    pub base_url: String,

    /// Path prefix the upstream serves its API under.
    pub api_prefix: String,

    /// Total time allowed for one upstream exchange, in seconds.
    pub timeout_secs: u64,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM.to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: 10,
            system_proxy: true,
        }
    }
}

/// Headers attached to every forwarded request, plus conditional extras.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeaderProfileConfig {
    /// Fixed header set, applied in key order.
    pub headers: BTreeMap<String, String>,

    /// Extra headers added when the request path contains a substring.
    pub rules: Vec<HeaderRuleConfig>,
}

/// A conditional header.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderRuleConfig {
    /// Substring that must appear in the matched path.
    pub path_contains: String,

    /// Header name to add.
    pub header: String,

    /// Header value to add.
    pub value: String,
}

impl HeaderRuleConfig {
    fn chapter_client_ip() -> Self {
        Self {
            path_contains: CHAPTER_DATA_PATH.to_string(),
            header: "X-Client-IP".to_string(),
            value: CLIENT_IP.to_string(),
        }
    }
}

fn header_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Serverless-style relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Mount the relay routes.
    pub enabled: bool,

    /// Route prefix the relay is mounted under.
    pub route_prefix: String,

    /// Query keys never forwarded upstream.
    pub strip_query: Vec<String>,

    /// CDN cache-control headers set to `no-store` on relayed responses.
    pub cdn_no_store_headers: Vec<String>,

    /// Outgoing header profile.
    pub profile: HeaderProfileConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            route_prefix: "/api/proxy".to_string(),
            strip_query: vec!["path".to_string(), "_t".to_string()],
            cdn_no_store_headers: vec![
                "CDN-Cache-Control".to_string(),
                "Vercel-CDN-Cache-Control".to_string(),
            ],
            profile: HeaderProfileConfig {
                headers: header_map(&[
                    ("Accept", ACCEPT),
                    ("Accept-Language", "en-US,en;q=0.9,vi;q=0.8"),
                    ("Cache-Control", "no-cache"),
                    ("Cookie", "NEXT_LOCALE=en"),
                    ("Referer", REFERER),
                    ("Sec-Ch-Ua", SEC_CH_UA),
                    ("Sec-Ch-Ua-Mobile", "?0"),
                    ("Sec-Ch-Ua-Platform", SEC_CH_UA_PLATFORM),
                    ("Sec-Fetch-Dest", "empty"),
                    ("Sec-Fetch-Mode", "cors"),
                    ("Sec-Fetch-Site", "cross-site"),
                    ("User-Agent", USER_AGENT),
                ]),
                rules: vec![HeaderRuleConfig::chapter_client_ip()],
            },
        }
    }
}

/// Development-server style passthrough.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevProxyConfig {
    /// Mount the passthrough routes.
    pub enabled: bool,

    /// Route prefix; the prefix itself is kept when forwarding.
    pub route_prefix: String,

    /// Outgoing header profile.
    pub profile: HeaderProfileConfig,
}

impl Default for DevProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            route_prefix: "/api".to_string(),
            profile: HeaderProfileConfig {
                headers: header_map(&[
                    ("Accept", ACCEPT),
                    ("Referer", REFERER),
                    ("User-Agent", USER_AGENT),
                    ("sec-ch-ua", SEC_CH_UA),
                    ("sec-ch-ua-mobile", "?0"),
                    ("sec-ch-ua-platform", SEC_CH_UA_PLATFORM),
                ]),
                rules: vec![HeaderRuleConfig::chapter_client_ip()],
            },
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
