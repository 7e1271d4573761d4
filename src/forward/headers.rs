//! Outgoing header profiles.
//!
//! A profile is compiled once from configuration into validated header
//! names and values, so building a request never re-parses strings.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::HeaderProfileConfig;
use crate::forward::ForwardError;

/// An extra header added when the match subject contains `needle`.
#[derive(Debug, Clone)]
pub struct HeaderRule {
    needle: String,
    name: HeaderName,
    value: HeaderValue,
}

/// Fixed header set plus conditional rules.
#[derive(Debug, Clone, Default)]
pub struct HeaderProfile {
    headers: HeaderMap,
    rules: Vec<HeaderRule>,
}

impl HeaderProfile {
    /// Compile a profile from configuration.
    pub fn compile(config: &HeaderProfileConfig) -> Result<Self, ForwardError> {
        let mut headers = HeaderMap::with_capacity(config.headers.len());
        for (name, value) in &config.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let (name, value) = parse_header(&rule.header, &rule.value)?;
                Ok(HeaderRule {
                    needle: rule.path_contains.clone(),
                    name,
                    value,
                })
            })
            .collect::<Result<Vec<_>, ForwardError>>()?;

        Ok(Self { headers, rules })
    }

    /// Headers to send for a request whose path (or URL) is `subject`.
    pub fn headers_for(&self, subject: &str) -> HeaderMap {
        let mut headers = self.headers.clone();
        for rule in &self.rules {
            if subject.contains(&rule.needle) {
                headers.insert(rule.name.clone(), rule.value.clone());
            }
        }
        headers
    }

    /// Overlay the profile onto headers copied from the inbound request.
    pub fn apply(&self, subject: &str, headers: &mut HeaderMap) {
        for (name, value) in self.headers_for(subject).iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ForwardError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
        ForwardError::InvalidHeader {
            name: name.to_string(),
        }
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|_| ForwardError::InvalidHeader {
        name: name.to_string(),
    })?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DevProxyConfig, HeaderRuleConfig, RelayConfig};

    #[test]
    fn test_relay_profile_defaults() {
        let profile = HeaderProfile::compile(&RelayConfig::default().profile).unwrap();
        let headers = profile.headers_for("/ICD10/root");

        assert_eq!(headers["referer"], "https://icd.kcb.vn/");
        assert_eq!(headers["cookie"], "NEXT_LOCALE=en");
        assert_eq!(headers["sec-fetch-mode"], "cors");
        assert!(headers["user-agent"].to_str().unwrap().contains("Chrome/144"));
        assert!(!headers.contains_key("x-client-ip"));
    }

    #[test]
    fn test_rule_matches_substring() {
        let profile = HeaderProfile::compile(&RelayConfig::default().profile).unwrap();
        let headers = profile.headers_for("/ICD10/data/chapter");
        assert_eq!(headers["x-client-ip"], "42.114.35.89");

        // Only the chapter endpoint is decorated.
        let headers = profile.headers_for("/ICD10/data/section");
        assert!(!headers.contains_key("x-client-ip"));
    }

    #[test]
    fn test_dev_profile_matches_full_url() {
        let profile = HeaderProfile::compile(&DevProxyConfig::default().profile).unwrap();
        let headers = profile.headers_for("/api/ICD10/data/chapter?id=I&lang=vi");
        assert_eq!(headers["x-client-ip"], "42.114.35.89");
        assert!(!headers.contains_key("cookie"));
    }

    #[test]
    fn test_apply_overrides_inbound() {
        let profile = HeaderProfile::compile(&DevProxyConfig::default().profile).unwrap();
        let mut inbound = HeaderMap::new();
        inbound.insert("user-agent", HeaderValue::from_static("curl/8.0"));
        inbound.insert("x-custom", HeaderValue::from_static("kept"));

        profile.apply("/api/ICD10/root", &mut inbound);

        assert!(inbound["user-agent"].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(inbound["x-custom"], "kept");
    }

    #[test]
    fn test_invalid_rule_is_rejected() {
        let config = HeaderProfileConfig {
            headers: Default::default(),
            rules: vec![HeaderRuleConfig {
                path_contains: "/x".into(),
                header: "bad header".into(),
                value: "v".into(),
            }],
        };
        let err = HeaderProfile::compile(&config).unwrap_err();
        assert!(matches!(err, ForwardError::InvalidHeader { name } if name == "bad header"));
    }
}
