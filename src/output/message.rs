//! Singer message types
//!
//! One JSON object per line, discriminated by `type`.

use crate::types::{format_timestamp, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message on the Singer output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Describes the records of a stream that follow
    Schema {
        /// Stream name
        stream: String,
        /// JSON Schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key fields
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: JsonValue,
        /// When the record was extracted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },
    /// A full state snapshot
    State {
        /// The state document
        value: JsonValue,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: JsonValue,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties,
        }
    }

    /// Create a record message
    pub fn record(stream: impl Into<String>, record: JsonValue, time_extracted: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(format_timestamp(time_extracted)),
        }
    }

    /// Create a state message
    pub fn state(value: JsonValue) -> Self {
        Self::State { value }
    }

    /// Stream this message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}
