//! Request cache module
//!
//! Single-flight deduplication for page fetches, keyed by request identity
//! (`path + query` for REST, `collection + filters + sort + cursor` for the
//! document store). Concurrent callers with the same key share one fetch.
//!
//! # Overview
//!
//! - `RequestCache` - in-flight dedup plus optional in-memory reuse
//! - `CacheConfig` - stale time and retry policy
//! - `RetryPolicy` - caller-side retries with constant/linear/exponential backoff

mod retry;

pub use retry::RetryPolicy;

use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Configuration for a request cache
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// How long a settled result may be reused; `None` drops it on settle
    pub stale_time: Option<Duration>,
    /// Retries applied inside the shared fetch
    pub retry: RetryPolicy,
}

impl CacheConfig {
    /// Dedup only: nothing outlives its in-flight request
    pub fn dedup_only() -> Self {
        Self::default()
    }

    /// Keep settled results for `stale_time`
    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Retry retryable failures
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

enum Entry<V: Clone> {
    InFlight(SharedFetch<V>),
    Ready { value: V, fetched_at: Instant },
}

/// Single-flight request cache
pub struct RequestCache<V: Clone> {
    config: CacheConfig,
    entries: Mutex<HashMap<String, Entry<V>>>,
    fetches: AtomicUsize,
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Return the cached or in-flight result for `key`, or start `fetch`.
    ///
    /// Every concurrent caller with the same key awaits the same fetch.
    /// A failure still shared with other waiters arrives as `Error::Shared`;
    /// the last holder gets the original error back.
    pub async fn get_or_fetch<F, Fut>(&self, key: String, fetch: F) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().await;
            if self.config.stale_time.is_some() {
                entries.retain(|_, entry| match entry {
                    Entry::Ready { fetched_at, .. } => self.is_fresh(*fetched_at),
                    Entry::InFlight(_) => true,
                });
            }
            match entries.get(&key) {
                Some(Entry::Ready { value, fetched_at }) if self.is_fresh(*fetched_at) => {
                    debug!("Cache hit for {key}");
                    return Ok(value.clone());
                }
                Some(Entry::InFlight(pending)) => {
                    debug!("Joining in-flight request for {key}");
                    pending.clone()
                }
                _ => {
                    self.fetches.fetch_add(1, Ordering::SeqCst);
                    let pending = self.start(key.clone(), fetch);
                    entries.insert(key.clone(), Entry::InFlight(pending.clone()));
                    pending
                }
            }
        };

        let result = shared.clone().await;
        self.settle(&key, &shared, &result).await;
        drop(shared);
        result.map_err(|e| Arc::try_unwrap(e).unwrap_or_else(Error::Shared))
    }

    /// Drop any entry for `key`
    pub async fn invalidate(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of cached and in-flight entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no entry is cached or in flight
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Number of underlying fetches started (not counting retries)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn is_fresh(&self, fetched_at: Instant) -> bool {
        self.config
            .stale_time
            .is_some_and(|stale| fetched_at.elapsed() < stale)
    }

    fn start<F, Fut>(&self, key: String, fetch: F) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let retry = self.config.retry.clone();
        async move {
            let mut attempt = 0;
            loop {
                match fetch().await {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                        let delay = retry.calculate_backoff(attempt);
                        warn!(
                            "Request {} failed ({}), attempt {}/{}, retrying in {:?}",
                            key,
                            e,
                            attempt + 1,
                            retry.max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(Arc::new(e)),
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Replace the in-flight entry once its fetch resolves
    async fn settle(
        &self,
        key: &str,
        shared: &SharedFetch<V>,
        result: &std::result::Result<V, Arc<Error>>,
    ) {
        let mut entries = self.entries.lock().await;
        let ours = matches!(entries.get(key), Some(Entry::InFlight(p)) if p.ptr_eq(shared));
        if !ours {
            return;
        }

        match (result, self.config.stale_time) {
            (Ok(value), Some(_)) => {
                entries.insert(
                    key.to_string(),
                    Entry::Ready {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            _ => {
                entries.remove(key);
            }
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for RequestCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V: Clone> std::fmt::Debug for RequestCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("config", &self.config)
            .field("fetches", &self.fetches.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
