//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parent stream instance a child bookmark belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef<'a> {
    /// Field linking child records to the parent (e.g. `advertiser_id`)
    pub field: &'a str,
    /// The parent record's id
    pub id: &'a str,
}

impl<'a> ParentRef<'a> {
    /// Create a parent reference
    pub fn new(field: &'a str, id: &'a str) -> Self {
        Self { field, id }
    }
}

/// Key a bookmark is stored under within its stream
///
/// Root streams use the field name alone. Streams nested under a parent
/// instance use `{field}(parent_{parent_field}:{parent_id})`, so sibling
/// parent instances never share a bookmark.
pub fn bookmark_key(field: &str, parent: Option<ParentRef<'_>>) -> String {
    match parent {
        Some(parent) => format!("{field}(parent_{}:{})", parent.field, parent.id),
        None => field.to_string(),
    }
}

/// Complete persisted state for the tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-stream bookmarks, keyed by bookmark key
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BTreeMap<String, JsonValue>>,

    /// Stream in progress when the state was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_syncing: Option<String>,

    /// Keys written by other tools, preserved as-is
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a bookmark value
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&JsonValue> {
        self.bookmarks.get(stream)?.get(key)
    }

    /// Upsert a bookmark value
    pub fn set_bookmark(&mut self, stream: &str, key: impl Into<String>, value: JsonValue) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.into(), value);
    }

    /// Stream currently being synced
    pub fn currently_syncing(&self) -> Option<&str> {
        self.currently_syncing.as_deref()
    }

    /// Mark or clear the stream being synced
    pub fn set_currently_syncing(&mut self, stream: Option<&str>) {
        self.currently_syncing = stream.map(String::from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("transaction_date", None, "transaction_date" ; "root stream")]
    #[test_case(
        "transaction_date",
        Some(ParentRef::new("advertiser_id", "42")),
        "transaction_date(parent_advertiser_id:42)" ; "child stream"
    )]
    #[test_case(
        "updated_at",
        Some(ParentRef::new("campaign_id", "abc-1")),
        "updated_at(parent_campaign_id:abc-1)" ; "string parent id"
    )]
    fn test_bookmark_key(field: &str, parent: Option<ParentRef<'_>>, expected: &str) {
        assert_eq!(bookmark_key(field, parent), expected);
    }

    #[test]
    fn test_bookmark_keys_do_not_collide_across_parents() {
        let a = bookmark_key("transaction_date", Some(ParentRef::new("advertiser_id", "1")));
        let b = bookmark_key("transaction_date", Some(ParentRef::new("advertiser_id", "12")));
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_default() {
        let state = SyncState::new();
        assert!(state.bookmarks.is_empty());
        assert!(state.currently_syncing().is_none());
    }

    #[test]
    fn test_state_bookmarks() {
        let mut state = SyncState::new();
        assert!(state.get_bookmark("transactions", "transaction_date").is_none());

        state.set_bookmark("transactions", "transaction_date", json!("2024-01-01"));
        assert_eq!(
            state.get_bookmark("transactions", "transaction_date"),
            Some(&json!("2024-01-01"))
        );
    }

    #[test]
    fn test_state_serialization_shape() {
        let mut state = SyncState::new();
        state.set_bookmark(
            "transactions",
            "transaction_date(parent_advertiser_id:42)",
            json!("2024-01-31T00:00:00.000000Z"),
        );
        state.set_currently_syncing(Some("accounts"));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "bookmarks": {
                    "transactions": {
                        "transaction_date(parent_advertiser_id:42)": "2024-01-31T00:00:00.000000Z"
                    }
                },
                "currently_syncing": "accounts"
            })
        );

        state.set_currently_syncing(None);
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("currently_syncing").is_none());
    }

    #[test]
    fn test_state_preserves_unknown_keys() {
        let state: SyncState =
            serde_json::from_value(json!({"bookmarks": {}, "version": 3})).unwrap();
        assert_eq!(state.extra.get("version"), Some(&json!(3)));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["version"], 3);
    }
}
