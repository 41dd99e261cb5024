//! HTTP client for page requests
//!
//! A thin layer over reqwest that:
//! - resolves paths against a base URL
//! - appends encoded query parameters
//! - applies default headers and optional throttling
//! - classifies non-2xx responses as `Error::HttpStatus`
//!
//! It never retries. Retry and backoff belong to the caller's cache layer.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::query::RequestParams;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Connection settings for a REST list backend
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for relative list paths, e.g. `https://api.example.com/v1`
    pub base_url: Option<String>,
    /// Per-request timeout (30 s unless set)
    pub timeout: Duration,
    /// Sent with every page request, e.g. a tenant or auth header
    pub default_headers: HashMap<String, String>,
    pub user_agent: String,
    /// Page-request throttling; off when `None`
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            default_headers: HashMap::new(),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            rate_limit: None,
        }
    }
}

impl HttpClientConfig {
    /// Start from the defaults
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder(Self::default())
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder(HttpClientConfig);

impl HttpClientConfigBuilder {
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.0.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.0.timeout = timeout;
        self
    }

    /// Throttle page requests
    #[must_use]
    pub fn rate_limit(mut self, limit: RateLimiterConfig) -> Self {
        self.0.rate_limit = Some(limit);
        self
    }

    /// Add one default header; a repeated name replaces the earlier value
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.default_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.0.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.0
    }
}

/// HTTP client for offset-paginated list endpoints
pub struct HttpClient {
    inner: Client,
    config: HttpClientConfig,
    throttle: Option<RateLimiter>,
}

impl HttpClient {
    /// Client with no base URL and default settings
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Client for `config`; unusable default headers are skipped with a warning
    pub fn with_config(config: HttpClientConfig) -> Self {
        let inner = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(header_map(&config.default_headers))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner,
            throttle: config.rate_limit.as_ref().map(RateLimiter::new),
            config,
        }
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Whether page requests are throttled
    pub fn has_rate_limiter(&self) -> bool {
        self.throttle.is_some()
    }

    /// Resolve `path` against the base URL and append `params` in order.
    ///
    /// Absolute `http(s)://` paths bypass the base URL.
    pub fn build_url(&self, path: &str, params: &RequestParams) -> Result<Url> {
        let absolute = path.starts_with("http://") || path.starts_with("https://");
        let mut url = match (&self.config.base_url, absolute) {
            (Some(base), false) => Url::parse(&format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ))?,
            _ => Url::parse(path)?,
        };

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        Ok(url)
    }

    /// GET `path`; any non-2xx status becomes `Error::HttpStatus`
    pub async fn get(&self, path: &str, params: &RequestParams) -> Result<Response> {
        let url = self.build_url(path, params)?;
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let started = Instant::now();
        let response = self.inner.request(Method::GET, url.clone()).send().await?;
        let status = response.status().as_u16();
        debug!("GET {} -> {} in {:?}", url, status, started.elapsed());

        if response.status().is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::http_status(status, body))
        }
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
    ) -> Result<T> {
        Ok(self.get(path, params).await?.json().await?)
    }
}

fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!("Skipping invalid default header '{}'", key),
        }
    }
    map
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.throttle.is_some())
            .finish_non_exhaustive()
    }
}
