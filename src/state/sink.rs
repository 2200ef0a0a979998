//! State persistence targets
//!
//! Every state mutation is pushed to each registered sink before the
//! mutating call returns.

use super::types::SyncState;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Somewhere state is durably written
pub trait StateSink: Send {
    /// Persist a full state snapshot
    fn persist(&mut self, state: &SyncState) -> Result<()>;
}

/// File-based sink with atomic writes
#[derive(Debug, Clone)]
pub struct FileStateSink {
    path: PathBuf,
}

impl FileStateSink {
    /// Create a sink writing to the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateSink for FileStateSink {
    fn persist(&mut self, state: &SyncState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::state(format!("Failed to create state directory: {e}")))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }
}

/// In-memory sink recording every snapshot
#[derive(Debug, Clone, Default)]
pub struct MemoryStateSink {
    snapshots: Arc<Mutex<Vec<SyncState>>>,
}

impl MemoryStateSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots persisted so far, oldest first
    pub fn snapshots(&self) -> Vec<SyncState> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// The most recent snapshot
    pub fn last(&self) -> Option<SyncState> {
        self.snapshots.lock().ok().and_then(|s| s.last().cloned())
    }
}

impl StateSink for MemoryStateSink {
    fn persist(&mut self, state: &SyncState) -> Result<()> {
        self.snapshots
            .lock()
            .map_err(|_| Error::state("State snapshot lock poisoned"))?
            .push(state.clone());
        Ok(())
    }
}
