//! Message writers
//!
//! `SingerWriter` serializes messages as JSON lines to any `Write` (stdout
//! in production). `MemoryWriter` keeps them for inspection. Both also act
//! as state sinks, emitting a STATE message per persisted snapshot.

use super::message::Message;
use crate::error::{Error, Result};
use crate::state::{StateSink, SyncState};
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use std::io::{Stdout, Write};
use std::sync::{Arc, Mutex};

/// Destination for Singer messages
pub trait MessageWriter: Send {
    /// Write one message
    fn write_message(&mut self, message: &Message) -> Result<()>;

    /// Write a SCHEMA message
    fn write_schema(
        &mut self,
        stream: &str,
        schema: &JsonValue,
        key_properties: &[String],
        bookmark_properties: &[String],
    ) -> Result<()> {
        self.write_message(&Message::schema(
            stream,
            schema.clone(),
            key_properties.to_vec(),
            bookmark_properties.to_vec(),
        ))
    }

    /// Write a RECORD message
    fn write_record(
        &mut self,
        stream: &str,
        record: JsonValue,
        time_extracted: DateTime<Utc>,
    ) -> Result<()> {
        self.write_message(&Message::record(stream, record, time_extracted))
    }

    /// Write a STATE message
    fn write_state(&mut self, state: &SyncState) -> Result<()> {
        let value = serde_json::to_value(state)
            .map_err(|e| Error::output(format!("Failed to serialize state: {e}")))?;
        self.write_message(&Message::state(value))
    }
}

/// JSON-lines writer
#[derive(Debug)]
pub struct SingerWriter<W: Write + Send> {
    out: W,
}

impl SingerWriter<Stdout> {
    /// Writer on the process's stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> SingerWriter<W> {
    /// Create a writer over `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the writer, returning the underlying output
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MessageWriter for SingerWriter<W> {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        let line = serde_json::to_string(message)
            .map_err(|e| Error::output(format!("Failed to serialize message: {e}")))?;
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))
    }
}

impl<W: Write + Send> StateSink for SingerWriter<W> {
    fn persist(&mut self, state: &SyncState) -> Result<()> {
        self.write_state(state)
    }
}

/// In-memory writer; clones share the same message log
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemoryWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Records written for `stream`, in order
    pub fn records(&self, stream: &str) -> Vec<JsonValue> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Streams a SCHEMA message was written for, in order
    pub fn schema_streams(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream),
                _ => None,
            })
            .collect()
    }

    /// The most recent STATE value
    pub fn last_state(&self) -> Option<JsonValue> {
        self.messages().into_iter().rev().find_map(|m| match m {
            Message::State { value } => Some(value),
            _ => None,
        })
    }
}

impl MessageWriter for MemoryWriter {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        self.messages
            .lock()
            .map_err(|_| Error::output("Message log lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

impl StateSink for MemoryWriter {
    fn persist(&mut self, state: &SyncState) -> Result<()> {
        self.write_state(state)
    }
}
