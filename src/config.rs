//! Tap configuration
//!
//! The Singer `--config` file, deserialized and validated once at startup.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::parse_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default AWIN API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.awin.com";

/// Longest accepted attribution window, in days
pub const MAX_ATTRIBUTION_WINDOW_DAYS: i64 = 3650;

/// Runtime configuration for a sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// OAuth2 bearer token issued by AWIN
    #[serde(default)]
    pub oauth2_token: String,

    /// Bookmark floor for streams with no saved state
    #[serde(deserialize_with = "deserialize_datetime")]
    pub start_date: DateTime<Utc>,

    /// Days re-scanned on every run to catch late-settling records
    #[serde(default = "default_attribution_window")]
    pub attribution_window: i64,

    /// Optional `User-Agent` header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Client-side request budget (0 disables limiting)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_attribution_window() -> i64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_requests_per_minute() -> u32 {
    20
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    6
}

fn deserialize_datetime<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).map_err(serde::de::Error::custom)
}

impl TapConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate config JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;

        if raw.get("start_date").is_none() {
            return Err(Error::missing_field("start_date"));
        }

        let config: TapConfig = serde_json::from_value(raw)
            .map_err(|e| Error::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field-level invariants
    pub fn validate(&self) -> Result<()> {
        if self.oauth2_token.trim().is_empty() {
            return Err(Error::missing_field("oauth2_token"));
        }
        if self.attribution_window < 0 {
            return Err(Error::invalid_value(
                "attribution_window",
                "must be zero or a positive number of days",
            ));
        }
        if self.attribution_window > MAX_ATTRIBUTION_WINDOW_DAYS {
            return Err(Error::invalid_value(
                "attribution_window",
                format!("must be at most {MAX_ATTRIBUTION_WINDOW_DAYS} days"),
            ));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        Ok(())
    }

    /// Attribution lookback as a duration
    pub fn attribution_lookback(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.attribution_window).unwrap_or(chrono::Duration::MAX)
    }

    /// Build the HTTP client configuration for this run
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .bearer_token(&self.oauth2_token)
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .max_retries(self.max_retries);

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }

        builder = if self.requests_per_minute == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::per_minute(self.requests_per_minute))
        };

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_config_defaults() {
        let config = TapConfig::from_json(
            r#"{"oauth2_token": "secret", "start_date": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(config.oauth2_token, "secret");
        assert_eq!(
            config.start_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(config.attribution_window, 30);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.requests_per_minute, 20);
        assert_eq!(config.max_retries, 6);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = TapConfig::from_json(
            r#"{
                "oauth2_token": "secret",
                "start_date": "2023-06-01",
                "attribution_window": 7,
                "user_agent": "tap-awin <ops@example.com>",
                "requests_per_minute": 0
            }"#,
        )
        .unwrap();

        assert_eq!(config.attribution_window, 7);
        assert_eq!(config.attribution_lookback(), chrono::Duration::days(7));
        assert_eq!(
            config.start_date,
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );

        let http = config.http_config();
        assert!(http.rate_limit.is_none());
        assert_eq!(http.user_agent, "tap-awin <ops@example.com>");
        assert_eq!(http.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_config_missing_token() {
        let err = TapConfig::from_json(r#"{"start_date": "2024-01-01"}"#).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "oauth2_token"));
    }

    #[test]
    fn test_config_missing_start_date() {
        let err = TapConfig::from_json(r#"{"oauth2_token": "secret"}"#).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "start_date"));
    }

    #[test]
    fn test_config_invalid_values() {
        let err = TapConfig::from_json(
            r#"{"oauth2_token": "t", "start_date": "2024-01-01", "attribution_window": -1}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));

        let err = TapConfig::from_json(r#"{"oauth2_token": "t", "start_date": "soon"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_config_rejects_huge_attribution_window() {
        let err = TapConfig::from_json(
            r#"{"oauth2_token": "t", "start_date": "2024-01-01", "attribution_window": 1000000000}"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "attribution_window")
        );

        let config = TapConfig::from_json(
            r#"{"oauth2_token": "t", "start_date": "2024-01-01", "attribution_window": 3650}"#,
        )
        .unwrap();
        assert_eq!(config.attribution_lookback(), chrono::Duration::days(3650));
    }

    #[test]
    fn test_attribution_lookback_saturates() {
        let mut config = TapConfig::from_json(
            r#"{"oauth2_token": "t", "start_date": "2024-01-01"}"#,
        )
        .unwrap();
        config.attribution_window = i64::MAX;
        assert_eq!(config.attribution_lookback(), chrono::Duration::MAX);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"oauth2_token": "secret", "start_date": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let config = TapConfig::from_file(&path).unwrap();
        assert_eq!(config.oauth2_token, "secret");

        assert!(TapConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
