//! Execution engine module
//!
//! Recursive parent/child stream sync with date windows and bookmarks.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncContext` - Everything a sync run reads and mutates, passed down
//!   the stream tree
//! - `BookmarkTracker` - Running maximum of a stream's bookmark field
//! - `SyncStats` - Counters reported when the run ends
//!
//! Execution is strictly sequential and depth-first: for every record of a
//! parent window, each active child stream runs its whole window loop
//! before the next parent record is looked at.

mod emit;
mod types;

pub use emit::{emit_records, BookmarkTracker};
pub use types::{ParentInstance, SyncStats};

use crate::catalog::{flatten, SelectionSet, StreamCatalog, StreamDefinition};
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::normalize::decamelize;
use crate::output::MessageWriter;
use crate::schema::Catalog;
use crate::state::{ParentRef, StateManager};
use crate::types::{format_timestamp, parse_datetime, JsonValue, StringMap};
use crate::window::{DateWindow, WindowPlanner};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// State shared by every stream sync of one run
pub struct SyncContext {
    /// API transport
    client: Box<dyn Transport>,
    /// Tap configuration
    config: TapConfig,
    /// Singer catalog (schemas and selection)
    catalog: Catalog,
    /// Bookmarks, persisted on every update
    state: StateManager,
    /// Output stream
    writer: Box<dyn MessageWriter>,
    /// Windows are planned up to this instant
    now: DateTime<Utc>,
    /// Statistics
    stats: SyncStats,
    /// Streams whose SCHEMA message has been written
    schemas_written: HashSet<String>,
}

impl SyncContext {
    /// Create a sync context
    pub fn new(
        client: impl Transport + 'static,
        config: TapConfig,
        catalog: Catalog,
        state: StateManager,
        writer: impl MessageWriter + 'static,
    ) -> Self {
        Self {
            client: Box::new(client),
            config,
            catalog,
            state,
            writer: Box::new(writer),
            now: Utc::now(),
            stats: SyncStats::default(),
            schemas_written: HashSet::new(),
        }
    }

    /// Fix the instant windows are planned up to
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The instant windows are planned up to
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Consume the context, returning the state manager
    pub fn into_state(self) -> StateManager {
        self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every selected stream and the ancestors they depend on
    pub async fn sync(&mut self, streams: &StreamCatalog) -> Result<SyncStats> {
        let start = Instant::now();

        info!(
            last_stream = ?self.state.currently_syncing(),
            "Last/currently syncing stream"
        );

        let selected = self.catalog.selected_streams();
        info!(?selected, "Selected streams");
        if selected.is_empty() {
            info!("No streams selected, nothing to sync");
            return Ok(self.stats.clone());
        }

        let flat = flatten(streams.roots());
        let selection = SelectionSet::expand(&flat, selected)?;
        info!(active = ?selection.active(), "Sync streams");

        for root in streams.roots() {
            if !selection.is_active(&root.name) {
                continue;
            }

            info!(stream = %root.name, "START Syncing");
            self.state.set_currently_syncing(Some(&root.name))?;

            let total = self.sync_endpoint(root, &selection, None).await?;

            self.state.set_currently_syncing(None)?;
            info!(stream = %root.name, total_records = total, "FINISHED Syncing");
        }

        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            records = self.stats.total_records(),
            requests = self.stats.requests,
            windows = self.stats.windows,
            streams = self.stats.streams_synced,
            duration_ms = self.stats.duration_ms,
            "Sync complete"
        );

        Ok(self.stats.clone())
    }

    /// Sync one stream, for one parent instance when nested
    ///
    /// Returns the number of records fetched for `definition` itself.
    pub fn sync_endpoint<'a>(
        &'a mut self,
        definition: &'a StreamDefinition,
        selection: &'a SelectionSet,
        parent: Option<&'a ParentInstance>,
    ) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            let stream = definition.name.as_str();
            let selected = selection.is_selected(stream);
            let parent_id = parent.map(|p| p.id.as_str());
            self.stats.add_stream();

            let schema = if selected {
                self.write_schema_once(definition)?;
                Some(self.record_schema(stream)?)
            } else {
                None
            };

            let parent_ref = match (definition.parent_field.as_deref(), parent) {
                (Some(field), Some(p)) => Some(ParentRef::new(field, &p.id)),
                _ => None,
            };

            let default_bookmark = format_timestamp(self.config.start_date);
            let last_bookmark = self.state.get_bookmark(
                stream,
                definition.bookmark_field.as_deref(),
                parent_ref,
                &default_bookmark,
            );
            let last_dttm = parse_datetime(&last_bookmark)?;
            let mut tracker = BookmarkTracker::new(definition.bookmark_field.as_deref(), last_dttm);

            let planner = WindowPlanner::new(self.now, self.config.attribution_lookback());
            let plan = if definition.is_windowed() {
                planner.windowed(last_dttm, definition.window_size_days())
            } else {
                planner.single(last_dttm)
            };
            debug!(
                stream,
                last_bookmark = %last_bookmark,
                window_size_days = plan.size_days(),
                "Planned windows"
            );

            let path = definition.path_for(parent_id);
            let children: Vec<&StreamDefinition> = definition
                .children
                .iter()
                .filter(|c| selection.is_active(&c.name))
                .collect();

            let mut endpoint_total = 0;

            for window in plan {
                self.stats.add_window();
                if definition.is_windowed() {
                    info!(stream, ?parent_id, window = %window, "START Sync");
                } else {
                    info!(stream, ?parent_id, "START Sync");
                }

                let params = request_params(definition, &window);
                let body = match self.client.get_json(&path, &params, stream).await {
                    Ok(body) => body,
                    Err(e) => {
                        error!(stream, path = %path, ?params, error = %e, "Request failed");
                        return Err(e);
                    }
                };
                self.stats.add_request();
                let time_extracted = Utc::now();

                let records: Vec<JsonValue> =
                    extract_records(body, definition.data_key.as_deref())
                        .into_iter()
                        .map(|r| prepare_record(r, definition, parent))
                        .collect();

                if records.is_empty() {
                    info!(stream, ?parent_id, "No data results returned");
                }

                if let Some(schema) = &schema {
                    let count = emit_records(
                        self.writer.as_mut(),
                        stream,
                        schema,
                        &records,
                        &mut tracker,
                        time_extracted,
                    )?;
                    self.stats.add_records(stream, count);
                    info!(stream, records = count, "Batch processed");
                }
                endpoint_total += records.len();

                if !children.is_empty() {
                    self.sync_children(definition, &children, selection, &records)
                        .await?;
                }

                if selected {
                    if let Some(field) = &definition.bookmark_field {
                        self.state.set_bookmark(
                            stream,
                            field,
                            parent_ref,
                            &format_timestamp(tracker.max()),
                        )?;
                        self.stats.add_bookmark();
                    }
                }
            }

            info!(stream, ?parent_id, records = endpoint_total, "Synced stream");
            Ok(endpoint_total)
        })
    }

    /// Run every active child stream for each parent record, in order
    async fn sync_children(
        &mut self,
        definition: &StreamDefinition,
        children: &[&StreamDefinition],
        selection: &SelectionSet,
        records: &[JsonValue],
    ) -> Result<()> {
        let stream = definition.name.as_str();
        let Some(id_field) = definition.parent_id_field() else {
            warn!(stream, "Stream has no id field, children not synced");
            return Ok(());
        };

        for record in records {
            let Some(instance) = record
                .get(id_field)
                .and_then(|v| ParentInstance::from_value(stream, v))
            else {
                warn!(stream, id_field, "Record has no parent id, children skipped");
                continue;
            };

            for child in children {
                info!(
                    stream = %child.name,
                    parent_stream = stream,
                    parent_id = %instance.id,
                    "START Sync for child stream"
                );
                let total = self.sync_endpoint(child, selection, Some(&instance)).await?;
                info!(
                    stream = %child.name,
                    parent_id = %instance.id,
                    total_records = total,
                    "FINISHED Sync for child stream"
                );
            }
        }
        Ok(())
    }

    /// Write a stream's SCHEMA message the first time it is needed
    fn write_schema_once(&mut self, definition: &StreamDefinition) -> Result<()> {
        if self.schemas_written.contains(&definition.name) {
            return Ok(());
        }

        let entry = self
            .catalog
            .get_stream(&definition.name)
            .ok_or_else(|| Error::StreamNotFound {
                stream: definition.name.clone(),
            })?;

        let key_properties = if entry.key_properties.is_empty() {
            definition.primary_key.clone()
        } else {
            entry.key_properties.clone()
        };
        let mut bookmark_properties = entry.bookmark_properties();
        if bookmark_properties.is_empty() {
            bookmark_properties.extend(definition.bookmark_field.clone());
        }

        self.writer.write_schema(
            &definition.name,
            &entry.schema,
            &key_properties,
            &bookmark_properties,
        )?;
        self.schemas_written.insert(definition.name.clone());
        Ok(())
    }

    /// Schema records of `stream` are validated against
    fn record_schema(&self, stream: &str) -> Result<JsonValue> {
        self.catalog
            .get_stream(stream)
            .map(|entry| entry.schema.clone())
            .ok_or_else(|| Error::StreamNotFound {
                stream: stream.to_string(),
            })
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("now", &self.now)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Stream parameters plus the window bounds, built fresh per window
fn request_params(definition: &StreamDefinition, window: &DateWindow) -> StringMap {
    let mut params = definition.params.clone();
    if let Some(fields) = &definition.date_window {
        params.insert(fields.from.clone(), window.start_param());
        params.insert(fields.to.clone(), window.end_param());
    }
    params
}

/// Pull the record array out of a response body
///
/// With a data key, the array under that key; otherwise the body itself,
/// a lone object counting as one record.
fn extract_records(body: Option<JsonValue>, data_key: Option<&str>) -> Vec<JsonValue> {
    let Some(body) = body else {
        return Vec::new();
    };

    let data = match (data_key, body) {
        (Some(key), JsonValue::Object(mut map)) => map.remove(key).unwrap_or(JsonValue::Null),
        (Some(_), _) => JsonValue::Null,
        (None, body) => body,
    };

    match data {
        JsonValue::Array(items) => items,
        JsonValue::Null => Vec::new(),
        JsonValue::Object(map) if map.is_empty() => Vec::new(),
        other => vec![other],
    }
}

/// Normalize keys and link the record to its parent
fn prepare_record(
    record: JsonValue,
    definition: &StreamDefinition,
    parent: Option<&ParentInstance>,
) -> JsonValue {
    let mut record = decamelize(record);
    if let (Some(field), Some(parent), JsonValue::Object(map)) =
        (definition.parent_field.as_deref(), parent, &mut record)
    {
        map.entry(field.to_string())
            .or_insert_with(|| parent.value.clone());
    }
    record
}
