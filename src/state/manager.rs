//! State manager implementation
//!
//! Owns the run's `SyncState` and pushes every mutation to its sinks
//! before returning, so a crashed run never loses a bookmark it already
//! advanced.

use super::sink::StateSink;
use super::types::{bookmark_key, ParentRef, SyncState};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::path::Path;
use tracing::info;

/// State manager for reading and persisting bookmarks
pub struct StateManager {
    /// Current state
    state: SyncState,
    /// Persistence targets, written on every mutation
    sinks: Vec<Box<dyn StateSink>>,
}

impl StateManager {
    /// Create a state manager around an existing state
    pub fn new(state: SyncState) -> Self {
        Self {
            state,
            sinks: Vec::new(),
        }
    }

    /// Create an empty state manager with no sinks
    pub fn in_memory() -> Self {
        Self::new(SyncState::new())
    }

    /// Load state from a file; a missing file yields an empty state
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::in_memory());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
        if contents.trim().is_empty() {
            return Ok(Self::in_memory());
        }
        Self::from_json(&contents)
    }

    /// Load state from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: SyncState = serde_json::from_str(json)
            .map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))?;
        Ok(Self::new(state))
    }

    /// Add a persistence target
    #[must_use]
    pub fn with_sink(mut self, sink: impl StateSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Add a persistence target in place
    pub fn add_sink(&mut self, sink: impl StateSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// The current state
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Consume the manager, returning the final state
    pub fn into_state(self) -> SyncState {
        self.state
    }

    /// Get a bookmark, falling back to `default`
    ///
    /// Returns `default` when there is no bookmark field or no stored value.
    pub fn get_bookmark(
        &self,
        stream: &str,
        field: Option<&str>,
        parent: Option<ParentRef<'_>>,
        default: &str,
    ) -> String {
        let Some(field) = field else {
            return default.to_string();
        };

        match self.state.get_bookmark(stream, &bookmark_key(field, parent)) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) | None => default.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Set a bookmark and persist the whole state
    pub fn set_bookmark(
        &mut self,
        stream: &str,
        field: &str,
        parent: Option<ParentRef<'_>>,
        value: &str,
    ) -> Result<()> {
        let key = bookmark_key(field, parent);
        self.state
            .set_bookmark(stream, key.clone(), JsonValue::String(value.to_string()));

        info!(
            stream,
            key = %key,
            value,
            "Write state for stream"
        );
        self.persist()
    }

    /// Stream marked as in progress
    pub fn currently_syncing(&self) -> Option<&str> {
        self.state.currently_syncing()
    }

    /// Mark or clear the stream in progress and persist
    pub fn set_currently_syncing(&mut self, stream: Option<&str>) -> Result<()> {
        self.state.set_currently_syncing(stream);
        self.persist()
    }

    /// Write the current state to every sink
    pub fn persist(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.persist(&self.state)?;
        }
        Ok(())
    }

    /// Export state as pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Number of registered sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("state", &self.state)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
