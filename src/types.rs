//! Common types used throughout the tap
//!
//! This module contains shared type definitions, type aliases,
//! and utility functions used across multiple modules.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Ordered string-to-string map, used for query parameters
pub type StringMap = BTreeMap<String, String>;

// ============================================================================
// Replication Mode
// ============================================================================

/// How a stream is replicated between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMode {
    /// Every run re-reads the full table
    #[default]
    FullTable,
    /// Runs resume from a persisted bookmark
    Incremental,
}

impl ReplicationMode {
    /// The Singer metadata spelling of this mode
    pub fn as_str(self) -> &'static str {
        match self {
            ReplicationMode::FullTable => "FULL_TABLE",
            ReplicationMode::Incremental => "INCREMENTAL",
        }
    }
}

impl std::fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Datetime Helpers
// ============================================================================

/// Parse a datetime string into UTC
///
/// Accepts RFC 3339 timestamps, naive datetimes (assumed UTC) and plain dates.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in datetime_formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
                return Ok(ndt.and_utc());
            }
        }
    }

    Err(Error::InvalidDatetime {
        value: s.to_string(),
    })
}

/// Format a timestamp the way Singer bookmarks are written
/// (`2024-01-31T12:00:00.000000Z`)
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
