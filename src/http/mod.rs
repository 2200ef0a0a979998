//! HTTP client module
//!
//! Provides the AWIN API client with retry, rate limiting, and backoff.
//!
//! # Features
//!
//! - **Automatic Retries**: 5xx, 429, connect errors and timeouts
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Transport Trait**: The seam the sync engine talks to

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, REQUEST_LIMIT_EXCEEDED};
pub use rate_limit::{RateLimiter, RateLimiterConfig, AWIN_REQUESTS_PER_MINUTE};
pub use transport::Transport;
