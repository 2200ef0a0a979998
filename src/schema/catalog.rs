//! Singer catalog
//!
//! The catalog carries per-stream JSON schemas, key properties and the
//! operator's stream selection. `discover` builds one from the stream tree
//! and the embedded schemas; a sync reads one from `--catalog`.

use crate::catalog::{flatten, StreamCatalog};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Embedded JSON schema for a built-in stream
pub fn builtin_schema(stream: &str) -> Option<&'static str> {
    match stream {
        "accounts" => Some(include_str!("../../schemas/accounts.json")),
        "publishers" => Some(include_str!("../../schemas/publishers.json")),
        "transactions" => Some(include_str!("../../schemas/transactions.json")),
        _ => None,
    }
}

/// One metadata entry, addressed by breadcrumb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Empty for the stream itself, `["properties", field]` for a field
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    /// Metadata values
    #[serde(default)]
    pub metadata: JsonObject,
}

/// A stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream identifier
    #[serde(default)]
    pub tap_stream_id: String,
    /// Stream name
    pub stream: String,
    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// JSON schema for records
    #[serde(default = "empty_schema")]
    pub schema: JsonValue,
    /// Breadcrumb metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Legacy selection flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

fn empty_schema() -> JsonValue {
    json!({"type": "object", "properties": {}})
}

impl CatalogEntry {
    /// Stream-level metadata (breadcrumb `[]`)
    pub fn stream_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Whether the operator selected this stream
    pub fn is_selected(&self) -> bool {
        if let Some(selected) = self
            .stream_metadata()
            .and_then(|m| m.get("selected"))
            .and_then(JsonValue::as_bool)
        {
            return selected;
        }
        if let Some(selected) = self.selected {
            return selected;
        }
        self.schema
            .get("selected")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Replication key fields advertised for this stream
    pub fn bookmark_properties(&self) -> Vec<String> {
        self.stream_metadata()
            .and_then(|m| m.get("valid-replication-keys"))
            .and_then(JsonValue::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(JsonValue::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The Singer catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams in the catalog
    #[serde(default)]
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::catalog(format!(
                "Failed to read catalog file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse catalog JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::catalog(format!("Invalid catalog JSON: {e}")))
    }

    /// Look up a stream entry
    pub fn get_stream(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.stream == stream)
    }

    /// Names of selected streams, in catalog order
    pub fn selected_streams(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|s| s.is_selected())
            .map(|s| s.stream.clone())
            .collect()
    }

    /// Mark streams as selected, returning the updated catalog
    #[must_use]
    pub fn with_selected(mut self, streams: &[&str]) -> Self {
        for entry in &mut self.streams {
            if !streams.contains(&entry.stream.as_str()) {
                continue;
            }
            match entry.metadata.iter_mut().find(|m| m.breadcrumb.is_empty()) {
                Some(top) => {
                    top.metadata.insert("selected".to_string(), JsonValue::Bool(true));
                }
                None => entry.metadata.push(MetadataEntry {
                    breadcrumb: Vec::new(),
                    metadata: [("selected".to_string(), JsonValue::Bool(true))]
                        .into_iter()
                        .collect(),
                }),
            }
        }
        self
    }

    /// Pretty JSON for stdout
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build a catalog for every stream in the tree
pub fn discover(streams: &StreamCatalog) -> Result<Catalog> {
    let flat = flatten(streams.roots());
    let mut entries = Vec::with_capacity(flat.len());

    for (name, flat_stream) in flat.iter() {
        let definition = flat_stream.definition;
        let schema: JsonValue = match builtin_schema(name) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                Error::catalog(format!("Invalid embedded schema for '{name}': {e}"))
            })?,
            None => empty_schema(),
        };

        let mut top = JsonObject::new();
        top.insert(
            "table-key-properties".to_string(),
            json!(definition.primary_key),
        );
        top.insert(
            "forced-replication-method".to_string(),
            json!(definition.replication_mode.as_str()),
        );
        if let Some(field) = &definition.bookmark_field {
            top.insert("valid-replication-keys".to_string(), json!([field]));
        }
        if let Some(parent) = flat_stream.parent {
            top.insert("parent-tap-stream-id".to_string(), json!(parent));
        }
        top.insert("inclusion".to_string(), json!("available"));

        let mut metadata = vec![MetadataEntry {
            breadcrumb: Vec::new(),
            metadata: top,
        }];

        if let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) {
            for field in properties.keys() {
                let automatic = definition.primary_key.contains(field)
                    || definition.bookmark_field.as_ref() == Some(field);
                let mut field_meta = JsonObject::new();
                field_meta.insert(
                    "inclusion".to_string(),
                    json!(if automatic { "automatic" } else { "available" }),
                );
                metadata.push(MetadataEntry {
                    breadcrumb: vec!["properties".to_string(), field.clone()],
                    metadata: field_meta,
                });
            }
        }

        entries.push(CatalogEntry {
            tap_stream_id: name.to_string(),
            stream: name.to_string(),
            key_properties: definition.primary_key.clone(),
            schema,
            metadata,
            selected: None,
        });
    }

    Ok(Catalog { streams: entries })
}
