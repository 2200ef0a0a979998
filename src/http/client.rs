//! HTTP client with retry and rate limiting
//!
//! Provides the AWIN API client that handles:
//! - Bearer authentication and user agent
//! - Automatic retries with exponential backoff
//! - Cooperative sleep when AWIN reports its request limit exceeded
//! - Client-side rate limiting to stay under the published quota
//! - Error classification for retry decisions

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue, StringMap};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// AWIN's error code for an exhausted request quota
pub const REQUEST_LIMIT_EXCEEDED: &str = "request.limit.exceeded";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Bearer token sent with every request
    pub bearer_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Multiplier applied per attempt for exponential backoff
    pub backoff_factor: u32,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Sleep before retrying when the API reports its limit exceeded
    pub rate_limit_sleep: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            bearer_token: None,
            timeout: Duration::from_secs(300),
            max_retries: 6,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(600),
            backoff_factor: 3,
            backoff_type: BackoffType::Exponential,
            rate_limit_sleep: Duration::from_secs(60),
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("awin-advertiser-tap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the bearer token
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set the exponential backoff multiplier
    pub fn backoff_factor(mut self, factor: u32) -> Self {
        self.config.backoff_factor = factor;
        self
    }

    /// Set the sleep used when the API reports its limit exceeded
    pub fn rate_limit_sleep(mut self, sleep: Duration) -> Self {
        self.config.rate_limit_sleep = sleep;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Error body returned by the AWIN API
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ApiErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// Human-readable message for a failed response
fn error_message(status: StatusCode, body: &ApiErrorBody) -> String {
    let detail = body
        .description
        .as_deref()
        .or(body.error.as_deref())
        .or_else(|| status.canonical_reason())
        .unwrap_or("Unknown Error");
    format!("HTTP-error-code: {}, Error: {}", status.as_u16(), detail)
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// GET a JSON document, retrying transient failures
    ///
    /// Returns `Ok(None)` when the server answers with an empty body.
    pub async fn get(&self, path: &str, query: &StringMap) -> Result<Option<JsonValue>> {
        let url = self.build_url(path);
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            match self.send_once(&url, query).await {
                Ok(body) => {
                    debug!(url = %url, "Request succeeded");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = match &e {
                        Error::RateLimited { .. } => self.config.rate_limit_sleep,
                        _ => self.calculate_backoff(attempt),
                    };
                    warn!(
                        url = %url,
                        error = %e,
                        "Request failed, attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Request failed");
                    return Err(e);
                }
            }
        }
    }

    /// Issue a single request and classify the response
    async fn send_once(&self, url: &str, query: &StringMap) -> Result<Option<JsonValue>> {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(ref token) = self.config.bearer_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                #[allow(clippy::cast_possible_truncation)]
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(None);
            }
            return serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| Error::decode(format!("Invalid JSON from {url}: {e}")));
        }

        let api_error = ApiErrorBody::parse(&body);

        if status == StatusCode::TOO_MANY_REQUESTS
            && api_error.error.as_deref() == Some(REQUEST_LIMIT_EXCEEDED)
        {
            return Err(Error::RateLimited {
                retry_after_seconds: self.config.rate_limit_sleep.as_secs(),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                url: url.to_string(),
                message: error_message(status, &api_error),
            });
        }

        if status.is_server_error() {
            return Err(Error::http_status(status.as_u16(), url, body));
        }

        Err(Error::http_status(
            status.as_u16(),
            url,
            error_message(status, &api_error),
        ))
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = self.config.backoff_factor.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_json(
        &self,
        path: &str,
        params: &StringMap,
        stream: &str,
    ) -> Result<Option<JsonValue>> {
        debug!(stream, path, ?params, "GET");
        self.get(path, params).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("max_retries", &self.config.max_retries)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
