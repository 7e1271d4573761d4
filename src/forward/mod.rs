//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (path, query, headers)
//!     → target.rs (rebuild upstream URL)
//!     → headers.rs (browser-only headers from the active profile)
//!     → Forwarder (reqwest GET / passthrough, timeout)
//!     → relay.rs (status, body, CORS, no-cache headers)
//!     → Response to caller
//! ```
//!
//! # Design Decisions
//! - One `Forwarder` per loaded config; a reload builds a fresh one
//! - Upstream bodies are decoded by the client; compression is negotiated
//!   with the upstream, not copied from the caller
//! - Upstream errors never panic the handler; they map to 500 (relay) or
//!   502/504 (passthrough)

pub mod headers;
pub mod relay;
pub mod target;

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::observability::metrics;

pub use headers::HeaderProfile;

/// Errors raised while building or forwarding a request.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("upstream request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("{0}")]
    Upstream(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ForwardError::Timeout(err)
        } else {
            ForwardError::Upstream(err)
        }
    }
}

impl ForwardError {
    /// Status reported by the passthrough proxy.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Inbound headers never copied upstream by the passthrough.
const NOT_FORWARDED: [&str; 2] = ["host", "accept-encoding"];

/// Forwards requests to the upstream API with a header profile applied.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: String,
    api_prefix: String,
    relay_profile: HeaderProfile,
    strip_query: Vec<String>,
    cdn_headers: Vec<HeaderName>,
    passthrough_profile: HeaderProfile,
}

impl Forwarder {
    /// Build a forwarder from a validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ForwardError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.upstream.timeout_secs));
        if !config.upstream.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(ForwardError::Client)?;

        let cdn_headers = config
            .relay
            .cdn_no_store_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ForwardError::InvalidHeader { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client,
            base_url: config.upstream.base_url.trim_end_matches('/').to_string(),
            api_prefix: config.upstream.api_prefix.clone(),
            relay_profile: HeaderProfile::compile(&config.relay.profile)?,
            strip_query: config.relay.strip_query.clone(),
            cdn_headers,
            passthrough_profile: HeaderProfile::compile(&config.dev_proxy.profile)?,
        })
    }

    /// Upstream base URL this forwarder targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Relay a GET for `api_path` (already stripped of the route prefix).
    ///
    /// Returns the shaped response, or the upstream error for the caller to
    /// report.
    pub async fn relay(
        &self,
        api_path: &str,
        raw_query: Option<&str>,
        request_id: &str,
    ) -> Result<Response, ForwardError> {
        let start = Instant::now();
        let query = target::relay_query(raw_query, &self.strip_query);
        let url = target::join_target(&self.base_url, &self.api_prefix, api_path, &query);
        let headers = self.relay_profile.headers_for(api_path);

        tracing::debug!(request_id = %request_id, target = %url, "Relaying request");

        let result = async {
            let upstream = self.client.get(&url).headers(headers).send().await?;
            let status = upstream.status();
            let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
            let body = upstream.bytes().await?;
            Ok::<_, ForwardError>((status, content_type, body))
        }
        .await;

        match result {
            Ok((status, content_type, body)) => {
                tracing::info!(
                    request_id = %request_id,
                    target = %url,
                    status = status.as_u16(),
                    bytes = body.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                metrics::record_request("relay", status.as_u16(), start);
                Ok(relay::relay_response(
                    status,
                    content_type.as_ref(),
                    body,
                    &self.cdn_headers,
                ))
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, target = %url, error = %e, "Upstream error");
                metrics::record_upstream_error("relay");
                metrics::record_request("relay", 500, start);
                Err(e)
            }
        }
    }

    /// Forward any request under the passthrough prefix unchanged, apart from
    /// the header profile.
    ///
    /// `rest_path` is the inbound path after the route prefix; `subject` is
    /// the full inbound path and query, which header rules are matched against.
    #[allow(clippy::too_many_arguments)]
    pub async fn passthrough(
        &self,
        method: Method,
        rest_path: &str,
        raw_query: Option<&str>,
        subject: &str,
        inbound_headers: &HeaderMap,
        body: Bytes,
        request_id: &str,
    ) -> Result<Response, ForwardError> {
        let start = Instant::now();
        let url = target::join_target(
            &self.base_url,
            &self.api_prefix,
            rest_path,
            raw_query.unwrap_or(""),
        );

        let mut headers = relay::strip_hop_by_hop(inbound_headers);
        for name in NOT_FORWARDED {
            headers.remove(name);
        }
        self.passthrough_profile.apply(subject, &mut headers);

        tracing::debug!(request_id = %request_id, method = %method, target = %url, "Forwarding request");

        let upstream = match self
            .client
            .request(method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!(request_id = %request_id, target = %url, error = %e, "Upstream error");
                metrics::record_upstream_error("passthrough");
                let err = ForwardError::from(e);
                metrics::record_request("passthrough", err.status().as_u16(), start);
                return Err(err);
            }
        };

        let status = upstream.status();
        tracing::info!(
            request_id = %request_id,
            target = %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );
        metrics::record_request("passthrough", status.as_u16(), start);

        let headers = relay::strip_hop_by_hop(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
