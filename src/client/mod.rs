//! Typed client for the ICD-10 API.
//!
//! Works against the upstream directly or through either proxy flavor: the
//! base URL is whatever prefix the `/ICD10/...` endpoints hang off, e.g.
//! `http://localhost:8080/api/proxy` or `https://ccs.whiteneuron.com/api`.

pub mod models;
pub mod probe;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::CLIENT_IP;
pub use models::{IcdNode, NodeData, NodeResponse, RootResponse};

pub const DEFAULT_LANG: &str = "vi";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// ICD-10 endpoint paths, relative to the API base.
pub mod endpoints {
    pub const ROOT: &str = "/ICD10/root";
    pub const SEARCH: &str = "/ICD10/search";
    pub const CODE: &str = "/ICD10/code";
    pub const CHAPTER: &str = "/ICD10/data/chapter";
    pub const SECTION: &str = "/ICD10/data/section";
    pub const TYPE: &str = "/ICD10/data/type";
    pub const DISEASE: &str = "/ICD10/data/disease";

    pub fn code_by_id(id: &str) -> String {
        format!("{CODE}/{id}")
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Levels below the chapter; these requests carry the client IP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Section,
    Type,
    Disease,
}

impl Level {
    fn endpoint(self) -> &'static str {
        match self {
            Level::Section => endpoints::SECTION,
            Level::Type => endpoints::TYPE,
            Level::Disease => endpoints::DISEASE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IcdClient {
    client: reqwest::Client,
    base_url: String,
    lang: String,
}

impl IcdClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    /// Language sent with every request (`vi` unless changed).
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All chapters.
    pub async fn root(&self) -> Result<RootResponse, ClientError> {
        self.get_json(endpoints::ROOT, &[], HeaderMap::new()).await
    }

    pub async fn chapter(&self, id: &str) -> Result<NodeResponse, ClientError> {
        self.get_json(endpoints::CHAPTER, &[("id", id)], HeaderMap::new())
            .await
    }

    pub async fn section(&self, id: &str) -> Result<NodeResponse, ClientError> {
        self.node(Level::Section, id).await
    }

    pub async fn node_type(&self, id: &str) -> Result<NodeResponse, ClientError> {
        self.node(Level::Type, id).await
    }

    pub async fn disease(&self, id: &str) -> Result<NodeResponse, ClientError> {
        self.node(Level::Disease, id).await
    }

    /// A node below chapter level.
    pub async fn node(&self, level: Level, id: &str) -> Result<NodeResponse, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-ip", HeaderValue::from_static(CLIENT_IP));
        self.get_json(level.endpoint(), &[("id", id)], headers).await
    }

    /// Free-text search; the result shape is upstream-defined.
    pub async fn search(&self, query: &str) -> Result<serde_json::Value, ClientError> {
        self.get_json(endpoints::SEARCH, &[("q", query)], HeaderMap::new())
            .await
    }

    /// Look up a code value, e.g. `A00.0`.
    pub async fn code(&self, code: &str) -> Result<serde_json::Value, ClientError> {
        self.get_json(endpoints::CODE, &[("code", code)], HeaderMap::new())
            .await
    }

    pub async fn code_by_id(&self, id: &str) -> Result<serde_json::Value, ClientError> {
        self.get_json(&endpoints::code_by_id(id), &[], HeaderMap::new())
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        mut headers: HeaderMap,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let cache_bust = cache_bust_millis().to_string();

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("lang", self.lang.as_str()));
        query.push(("_t", cache_bust.as_str()));

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        tracing::debug!(url = %url, "ICD API request");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "ICD API error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn cache_bust_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
