//! Client-side request throttling
//!
//! Scroll-driven page loads arrive in bursts. A governor token bucket spaces
//! them out before they reach the backend. Disabled unless configured.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Page-request budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained page requests per second
    pub per_second: u32,
    /// Requests allowed back to back before throttling starts
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_burst() -> u32 {
    1
}

impl RateLimiterConfig {
    /// `per_second` sustained, up to `burst` at once
    pub fn new(per_second: u32, burst: u32) -> Self {
        Self { per_second, burst }
    }
}

/// Token bucket shared by clones of one client
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// Build the bucket; zero rates count as one
    pub fn new(config: &RateLimiterConfig) -> Self {
        let per_second = NonZeroU32::new(config.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);

        Self {
            bucket: Arc::new(Governor::direct(
                Quota::per_second(per_second).allow_burst(burst),
            )),
        }
    }

    /// Wait for a permit and return how long the request was held back
    pub async fn acquire(&self) -> Duration {
        if self.bucket.check().is_ok() {
            return Duration::ZERO;
        }
        let started = Instant::now();
        self.bucket.until_ready().await;
        let waited = started.elapsed();
        debug!("Page request throttled for {:?}", waited);
        waited
    }

    /// Take a permit only if one is free now
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_burst_defaults_to_one() {
        let config: RateLimiterConfig = serde_yaml::from_str("per_second: 4").unwrap();
        assert_eq!(config, RateLimiterConfig::new(4, 1));
    }

    #[test]
    fn test_burst_then_throttled() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_reports_wait() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(20, 1));

        assert_eq!(limiter.acquire().await, Duration::ZERO);
        let waited = limiter.acquire().await;
        assert!(waited > Duration::ZERO);
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_config_still_grants() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        let granted = tokio::time::timeout(Duration::from_secs(2), limiter.acquire()).await;
        assert!(granted.is_ok());
    }
}
