//! State management module
//!
//! Handles bookmark tracking and checkpointing for resumable syncs.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `SyncState` - Per-stream bookmarks plus the currently syncing marker
//! - `StateManager` - Bookmark get/set with persistence on every mutation
//! - `StateSink` - Persistence targets (file, memory, Singer STATE messages)

mod manager;
mod sink;
mod types;

pub use manager::StateManager;
pub use sink::{FileStateSink, MemoryStateSink, StateSink};
pub use types::{bookmark_key, ParentRef, SyncState};

#[cfg(test)]
mod manager_tests;
