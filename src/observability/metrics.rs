//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by flavor, status
//! - `proxy_upstream_duration_seconds` (histogram): upstream latency by flavor
//! - `proxy_upstream_errors_total` (counter): transport failures by flavor
//! - `proxy_config_reloads_total` (counter): reloads by outcome
//!
//! Recording is a no-op until a recorder is installed, so tests and
//! metrics-disabled deployments pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed proxied request.
pub fn record_request(flavor: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "flavor" => flavor,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_upstream_duration_seconds", "flavor" => flavor)
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream transport failure.
pub fn record_upstream_error(flavor: &'static str) {
    metrics::counter!("proxy_upstream_errors_total", "flavor" => flavor).increment(1);
}

/// Record a configuration reload attempt.
pub fn record_config_reload(applied: bool) {
    let outcome = if applied { "applied" } else { "rejected" };
    metrics::counter!("proxy_config_reloads_total", "outcome" => outcome).increment(1);
}
