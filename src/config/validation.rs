//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs, route prefixes and header profiles
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{HeaderProfileConfig, ProxyConfig};

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }

    let prefix = &config.upstream.api_prefix;
    if !prefix.is_empty() && !prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "upstream.api_prefix",
            "must be empty or start with '/'",
        ));
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    check_route_prefix("relay.route_prefix", &config.relay.route_prefix, &mut errors);
    check_route_prefix(
        "dev_proxy.route_prefix",
        &config.dev_proxy.route_prefix,
        &mut errors,
    );
    if config.relay.enabled
        && config.dev_proxy.enabled
        && config.relay.route_prefix == config.dev_proxy.route_prefix
    {
        errors.push(ValidationError::new(
            "relay.route_prefix",
            "must differ from dev_proxy.route_prefix",
        ));
    }

    check_profile("relay.profile", &config.relay.profile, &mut errors);
    check_profile("dev_proxy.profile", &config.dev_proxy.profile, &mut errors);

    for (i, name) in config.relay.cdn_no_store_headers.iter().enumerate() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("relay.cdn_no_store_headers[{i}]"),
                format!("'{name}' is not a valid header name"),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_route_prefix(field: &str, prefix: &str, errors: &mut Vec<ValidationError>) {
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::new(
            field,
            format!("'{prefix}' must start with '/' and not end with '/'"),
        ));
    }
}

fn check_profile(field: &str, profile: &HeaderProfileConfig, errors: &mut Vec<ValidationError>) {
    for (name, value) in &profile.headers {
        check_header(&format!("{field}.headers.{name}"), name, value, errors);
    }
    for (i, rule) in profile.rules.iter().enumerate() {
        let rule_field = format!("{field}.rules[{i}]");
        if rule.path_contains.is_empty() {
            errors.push(ValidationError::new(
                format!("{rule_field}.path_contains"),
                "must not be empty",
            ));
        }
        check_header(&rule_field, &rule.header, &rule.value, errors);
    }
}

fn check_header(field: &str, name: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{name}' is not a valid header name"),
        ));
    }
    if HeaderValue::from_str(value).is_err() {
        errors.push(ValidationError::new(field, "header value is not valid"));
    }
}
