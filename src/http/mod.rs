//! HTTP client module
//!
//! Provides the HTTP client used by the REST page source.
//!
//! # Features
//!
//! - **Base URL resolution**: relative list paths resolve against one base
//! - **Status classification**: non-2xx responses surface as `Error::HttpStatus`
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//!
//! The client does not retry; see `cache::RetryPolicy` for caller-side retries.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
