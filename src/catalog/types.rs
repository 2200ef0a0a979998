//! Stream definition types
//!
//! Declarative description of every stream the tap can extract, parsed from
//! the embedded YAML stream tree.

use crate::types::{ReplicationMode, StringMap};
use serde::{Deserialize, Serialize};

/// Placeholder in a path template that is replaced by the parent record's id
pub const PARENT_ID_PLACEHOLDER: &str = "{parent_id}";

/// The full stream tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamCatalog {
    /// Root streams, in sync order
    #[serde(default)]
    pub streams: Vec<StreamDefinition>,
}

impl StreamCatalog {
    /// Create a catalog from root streams
    pub fn new(streams: Vec<StreamDefinition>) -> Self {
        Self { streams }
    }

    /// Root streams, in sync order
    pub fn roots(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Find a stream anywhere in the tree
    pub fn find(&self, name: &str) -> Option<&StreamDefinition> {
        fn walk<'a>(streams: &'a [StreamDefinition], name: &str) -> Option<&'a StreamDefinition> {
            for stream in streams {
                if stream.name == name {
                    return Some(stream);
                }
                if let Some(found) = walk(&stream.children, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.streams, name)
    }
}

/// Query parameter names carrying a date window's bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindowFields {
    /// Parameter receiving the window start
    pub from: String,
    /// Parameter receiving the window end
    pub to: String,
}

/// One stream: an endpoint plus how to replicate it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,

    /// Endpoint path relative to the base URL; may contain `{parent_id}`
    pub path: String,

    /// Primary key fields (after key normalization)
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Full table or incremental
    #[serde(default)]
    pub replication_mode: ReplicationMode,

    /// Record field holding the high-watermark (incremental streams only)
    #[serde(default)]
    pub bookmark_field: Option<String>,

    /// Static query parameters sent with every request
    #[serde(default)]
    pub params: StringMap,

    /// Date window parameter names, when the endpoint is sliced by date
    #[serde(default)]
    pub date_window: Option<DateWindowFields>,

    /// Days per date window
    #[serde(default)]
    pub date_window_size_days: Option<u32>,

    /// Response key holding the record array; absent means the whole body
    #[serde(default)]
    pub data_key: Option<String>,

    /// Field injected into records of this stream referencing the parent's id
    #[serde(default)]
    pub parent_field: Option<String>,

    /// Field of this stream's records that children receive as `parent_id`
    #[serde(default)]
    pub parent_id_source_field: Option<String>,

    /// Child streams, synced once per record of this stream
    #[serde(default)]
    pub children: Vec<StreamDefinition>,
}

impl StreamDefinition {
    /// Create a full-table stream with no children
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_key: vec!["id".to_string()],
            replication_mode: ReplicationMode::FullTable,
            bookmark_field: None,
            params: StringMap::new(),
            date_window: None,
            date_window_size_days: None,
            data_key: None,
            parent_field: None,
            parent_id_source_field: None,
            children: Vec::new(),
        }
    }

    /// Set primary key fields
    #[must_use]
    pub fn with_primary_key(mut self, fields: &[&str]) -> Self {
        self.primary_key = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Make the stream incremental on the given bookmark field
    #[must_use]
    pub fn incremental(mut self, bookmark_field: impl Into<String>) -> Self {
        self.replication_mode = ReplicationMode::Incremental;
        self.bookmark_field = Some(bookmark_field.into());
        self
    }

    /// Slice requests into date windows
    #[must_use]
    pub fn with_date_window(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        size_days: u32,
    ) -> Self {
        self.date_window = Some(DateWindowFields {
            from: from.into(),
            to: to.into(),
        });
        self.date_window_size_days = Some(size_days);
        self
    }

    /// Add a static query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the record array key
    #[must_use]
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    /// Set the parent reference field injected into records
    #[must_use]
    pub fn with_parent_field(mut self, field: impl Into<String>) -> Self {
        self.parent_field = Some(field.into());
        self
    }

    /// Set the field children receive as their `parent_id`
    #[must_use]
    pub fn with_parent_id_source(mut self, field: impl Into<String>) -> Self {
        self.parent_id_source_field = Some(field.into());
        self
    }

    /// Add a child stream
    #[must_use]
    pub fn with_child(mut self, child: StreamDefinition) -> Self {
        self.children.push(child);
        self
    }

    /// Whether the stream resumes from a bookmark
    pub fn is_incremental(&self) -> bool {
        self.replication_mode == ReplicationMode::Incremental
    }

    /// Whether requests are sliced into date windows
    pub fn is_windowed(&self) -> bool {
        self.date_window.is_some()
    }

    /// Days per date window, defaulting to one
    pub fn window_size_days(&self) -> u32 {
        self.date_window_size_days.unwrap_or(1).max(1)
    }

    /// Render the request path for a parent instance
    pub fn path_for(&self, parent_id: Option<&str>) -> String {
        match parent_id {
            Some(id) => self.path.replace(PARENT_ID_PLACEHOLDER, id),
            None => self.path.clone(),
        }
    }

    /// Field whose value children receive as `parent_id`
    ///
    /// An explicit `parent_id_source_field` wins; otherwise a primary key
    /// named `id`, otherwise the first primary key field.
    pub fn parent_id_field(&self) -> Option<&str> {
        if let Some(field) = &self.parent_id_source_field {
            return Some(field);
        }
        self.primary_key
            .iter()
            .find(|f| f.as_str() == "id")
            .or_else(|| self.primary_key.first())
            .map(String::as_str)
    }
}
