//! Offset-paginated REST page source
//!
//! `GET {path}?{encoded query}` returns `{ data: [...], meta: {...} }`.
//! Identical in-flight requests share one network call.

use crate::cache::{CacheConfig, RequestCache};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::query::{Query, QueryEncoder};
use crate::types::{JsonValue, Page, PageCursor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Pagination metadata reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestMeta {
    /// Total matching rows
    pub total: u64,
    /// Total pages at the requested limit
    pub total_pages: u32,
    /// Page this response holds
    pub current_page: u32,
    /// Page size the backend applied
    pub limit: u32,
}

impl RestMeta {
    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Response envelope of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResponse<T> {
    pub data: Vec<T>,
    pub meta: RestMeta,
}

impl<T> RestResponse<T> {
    /// Convert into a page, deriving `has_next` and the next page cursor
    pub fn into_page(self) -> Page<T> {
        let has_next = self.meta.has_next();
        let cursor = has_next.then(|| PageCursor::Page(self.meta.current_page + 1));
        Page::new(self.data, cursor, has_next)
            .with_totals(self.meta.total, self.meta.total_pages)
    }
}

/// Page source over an offset-paginated REST backend
pub struct RestPageSource {
    client: Arc<HttpClient>,
    cache: RequestCache<RestResponse<JsonValue>>,
}

impl RestPageSource {
    /// Create a source with in-flight deduplication only
    pub fn new(client: HttpClient) -> Self {
        Self::with_cache(Arc::new(client), CacheConfig::dedup_only())
    }

    /// Create a source over a shared client with a custom cache policy
    pub fn with_cache(client: Arc<HttpClient>, config: CacheConfig) -> Self {
        Self {
            client,
            cache: RequestCache::new(config),
        }
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Number of network fetches started, after deduplication
    pub fn fetch_count(&self) -> usize {
        self.cache.fetch_count()
    }

    /// Fetch the raw response envelope for `query`
    pub async fn fetch_response(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<RestResponse<JsonValue>> {
        let params = QueryEncoder::encode_rest(query)?;
        let key = self.client.build_url(path, &params)?.to_string();

        let client = self.client.clone();
        let path = path.to_string();
        self.cache
            .get_or_fetch(key, move || {
                let client = client.clone();
                let path = path.clone();
                let params = params.clone();
                async move {
                    client
                        .get_json::<RestResponse<JsonValue>>(&path, &params)
                        .await
                }
            })
            .await
    }

    /// Fetch one page of `T`
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<Page<T>> {
        let response = self.fetch_response(path, query).await?;
        debug!(
            "Fetched page {}/{} of {} ({} rows)",
            response.meta.current_page,
            response.meta.total_pages,
            path,
            response.data.len()
        );

        let data = response
            .data
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect::<Result<Vec<T>>>()?;

        Ok(RestResponse {
            data,
            meta: response.meta,
        }
        .into_page())
    }
}

impl std::fmt::Debug for RestPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestPageSource")
            .field("client", &self.client)
            .field("cache", &self.cache)
            .finish()
    }
}
