//! Engine types
//!
//! Statistics and the parent binding passed to child stream syncs.

use crate::types::JsonValue;
use std::collections::BTreeMap;

/// A parent record a child stream is synced for
#[derive(Debug, Clone, PartialEq)]
pub struct ParentInstance {
    /// Parent stream name
    pub stream: String,
    /// Id as substituted into the child's request path
    pub id: String,
    /// Id as it appeared in the parent record, injected into child records
    pub value: JsonValue,
}

impl ParentInstance {
    /// Bind a parent record's id value
    ///
    /// Strings are used verbatim; other scalars use their JSON rendering.
    /// Returns `None` for null, arrays and objects.
    pub fn from_value(stream: impl Into<String>, value: &JsonValue) -> Option<Self> {
        let id = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            _ => return None,
        };
        Some(Self {
            stream: stream.into(),
            id,
            value: value.clone(),
        })
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records emitted, per stream
    pub records_emitted: BTreeMap<String, usize>,
    /// Total requests issued
    pub requests: usize,
    /// Total date windows processed
    pub windows: usize,
    /// Stream syncs run (one per root, one per child per parent record)
    pub streams_synced: usize,
    /// Bookmarks written
    pub bookmarks_written: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add emitted records for a stream
    pub fn add_records(&mut self, stream: &str, count: usize) {
        *self.records_emitted.entry(stream.to_string()).or_default() += count;
    }

    /// Total records emitted across streams
    pub fn total_records(&self) -> usize {
        self.records_emitted.values().sum()
    }

    /// Records emitted for one stream
    pub fn records_for(&self, stream: &str) -> usize {
        self.records_emitted.get(stream).copied().unwrap_or(0)
    }

    /// Add a request
    pub fn add_request(&mut self) {
        self.requests += 1;
    }

    /// Add a window
    pub fn add_window(&mut self) {
        self.windows += 1;
    }

    /// Add a stream sync
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a bookmark write
    pub fn add_bookmark(&mut self) {
        self.bookmarks_written += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
