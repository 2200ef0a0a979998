//! Tests for state manager

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

const START: &str = "2024-01-01T00:00:00Z";

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_from_file_missing_is_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("nope.json")).unwrap();
    assert_eq!(manager.state(), &SyncState::new());
}

#[test]
fn test_from_file_blank_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "  \n").unwrap();

    let manager = StateManager::from_file(&path).unwrap();
    assert!(manager.state().bookmarks.is_empty());
}

#[test]
fn test_from_json_reads_bookmarks() {
    let manager = StateManager::from_json(
        r#"{"bookmarks": {"transactions": {"transaction_date(parent_advertiser_id:1)": "2024-03-01T00:00:00.000000Z"}}}"#,
    )
    .unwrap();

    let value = manager.get_bookmark(
        "transactions",
        Some("transaction_date"),
        Some(ParentRef::new("advertiser_id", "1")),
        START,
    );
    assert_eq!(value, "2024-03-01T00:00:00.000000Z");
}

#[test]
fn test_from_json_invalid() {
    let err = StateManager::from_json("{oops").unwrap_err();
    assert!(err.to_string().contains("Failed to parse state JSON"));
}

// ============================================================================
// Bookmarks
// ============================================================================

#[test]
fn test_get_bookmark_defaults() {
    let manager = StateManager::in_memory();

    // No bookmark field configured
    assert_eq!(manager.get_bookmark("accounts", None, None, START), START);
    // Nothing stored yet
    assert_eq!(
        manager.get_bookmark("transactions", Some("transaction_date"), None, START),
        START
    );
}

#[test]
fn test_get_bookmark_null_falls_back() {
    let manager =
        StateManager::from_json(r#"{"bookmarks": {"transactions": {"transaction_date": null}}}"#)
            .unwrap();
    assert_eq!(
        manager.get_bookmark("transactions", Some("transaction_date"), None, START),
        START
    );
}

#[test]
fn test_set_bookmark_scoped_by_parent() {
    let mut manager = StateManager::in_memory();
    let a = ParentRef::new("advertiser_id", "1");
    let b = ParentRef::new("advertiser_id", "2");

    manager
        .set_bookmark("transactions", "transaction_date", Some(a), "2024-02-01T00:00:00.000000Z")
        .unwrap();

    assert_eq!(
        manager.get_bookmark("transactions", Some("transaction_date"), Some(a), START),
        "2024-02-01T00:00:00.000000Z"
    );
    assert_eq!(
        manager.get_bookmark("transactions", Some("transaction_date"), Some(b), START),
        START
    );
    assert_eq!(
        manager.get_bookmark("transactions", Some("transaction_date"), None, START),
        START
    );
}

#[test]
fn test_set_bookmark_persists_each_write() {
    let sink = MemoryStateSink::new();
    let mut manager = StateManager::in_memory().with_sink(sink.clone());

    manager
        .set_bookmark("transactions", "transaction_date", None, "2024-01-10T00:00:00.000000Z")
        .unwrap();
    manager
        .set_bookmark("transactions", "transaction_date", None, "2024-01-20T00:00:00.000000Z")
        .unwrap();

    let snapshots = sink.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(
        snapshots[0].get_bookmark("transactions", "transaction_date"),
        Some(&json!("2024-01-10T00:00:00.000000Z"))
    );
    assert_eq!(
        snapshots[1].get_bookmark("transactions", "transaction_date"),
        Some(&json!("2024-01-20T00:00:00.000000Z"))
    );
}

// ============================================================================
// Currently syncing
// ============================================================================

#[test]
fn test_currently_syncing_persists() {
    let sink = MemoryStateSink::new();
    let mut manager = StateManager::in_memory().with_sink(sink.clone());

    manager.set_currently_syncing(Some("accounts")).unwrap();
    assert_eq!(manager.currently_syncing(), Some("accounts"));
    assert_eq!(
        sink.last().unwrap().currently_syncing(),
        Some("accounts")
    );

    manager.set_currently_syncing(None).unwrap();
    assert!(manager.currently_syncing().is_none());
    assert!(sink.last().unwrap().currently_syncing().is_none());
    assert_eq!(sink.snapshots().len(), 2);
}

// ============================================================================
// File sink
// ============================================================================

#[test]
fn test_file_sink_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut manager = StateManager::in_memory().with_sink(FileStateSink::new(&path));
    manager
        .set_bookmark(
            "transactions",
            "transaction_date",
            Some(ParentRef::new("advertiser_id", "7")),
            "2024-05-05T00:00:00.000000Z",
        )
        .unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(reloaded.state(), manager.state());
}

#[test]
fn test_multiple_sinks_all_receive_state() {
    let first = MemoryStateSink::new();
    let second = MemoryStateSink::new();
    let mut manager = StateManager::in_memory()
        .with_sink(first.clone())
        .with_sink(second.clone());
    assert_eq!(manager.sink_count(), 2);

    manager.set_currently_syncing(Some("transactions")).unwrap();
    assert_eq!(first.snapshots().len(), 1);
    assert_eq!(second.snapshots().len(), 1);
}

#[test]
fn test_to_json_pretty() {
    let mut manager = StateManager::in_memory();
    manager
        .set_bookmark("transactions", "transaction_date", None, "2024-01-01T00:00:00.000000Z")
        .unwrap();

    let json = manager.to_json_pretty().unwrap();
    assert!(json.contains("\"bookmarks\""));
    assert!(json.contains("2024-01-01T00:00:00.000000Z"));
}
