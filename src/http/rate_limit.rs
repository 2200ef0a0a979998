//! Client-side rate limiting
//!
//! AWIN allows 20 requests per minute per token. A governor token bucket
//! keeps the tap under that budget instead of relying on 429 responses.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// AWIN's published limit for the advertiser API
pub const AWIN_REQUESTS_PER_MINUTE: u32 = 20;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per minute
    pub requests_per_minute: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::per_minute(AWIN_REQUESTS_PER_MINUTE)
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size,
        }
    }

    /// Quota of `n` requests per minute, all of which may burst
    pub fn per_minute(n: u32) -> Self {
        Self::new(n, n)
    }
}

/// Client-side request budget shared by every request of a run
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    requests_per_minute: u32,
}

impl RateLimiter {
    /// Build a limiter; zero rates are clamped to one request per minute
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rate).allow_burst(burst);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            requests_per_minute: rate.get(),
        }
    }

    /// Wait until the budget allows another request
    pub async fn wait(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!(
            requests_per_minute = self.requests_per_minute,
            "Request budget exhausted, waiting"
        );
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available, without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Effective requests per minute
    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_minute", &self.requests_per_minute)
            .finish_non_exhaustive()
    }
}
