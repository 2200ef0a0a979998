//! Bookmark-tracking record emission
//!
//! Every record is validated and written; records carrying the bookmark
//! field may raise the running maximum but are never filtered by it.

use crate::error::{Error, Result};
use crate::output::MessageWriter;
use crate::schema::validate;
use crate::types::{parse_datetime, JsonValue};
use chrono::{DateTime, Utc};
use tracing::error;

/// Running high-watermark of a stream's bookmark field
#[derive(Debug, Clone)]
pub struct BookmarkTracker {
    field: Option<String>,
    max: DateTime<Utc>,
}

impl BookmarkTracker {
    /// Start tracking from the last persisted bookmark
    pub fn new(field: Option<&str>, last_bookmark: DateTime<Utc>) -> Self {
        Self {
            field: field.map(String::from),
            max: last_bookmark,
        }
    }

    /// Raise the maximum if `record` carries a later bookmark value
    ///
    /// A missing or null bookmark field leaves the maximum unchanged.
    pub fn observe(&mut self, record: &JsonValue) -> Result<()> {
        let Some(field) = &self.field else {
            return Ok(());
        };

        let value = match record.get(field) {
            None | Some(JsonValue::Null) => return Ok(()),
            Some(JsonValue::String(s)) => parse_datetime(s)?,
            Some(other) => {
                return Err(Error::InvalidDatetime {
                    value: other.to_string(),
                })
            }
        };

        if value > self.max {
            self.max = value;
        }
        Ok(())
    }

    /// The highest bookmark seen so far
    pub fn max(&self) -> DateTime<Utc> {
        self.max
    }
}

/// Validate and write `records`, returning how many were written
pub fn emit_records(
    writer: &mut dyn MessageWriter,
    stream: &str,
    schema: &JsonValue,
    records: &[JsonValue],
    tracker: &mut BookmarkTracker,
    time_extracted: DateTime<Utc>,
) -> Result<usize> {
    let mut count = 0;
    for record in records {
        let errors = validate(schema, record);
        if !errors.is_empty() {
            error!(stream, record = %record, ?errors, "Record failed schema validation");
            return Err(Error::SchemaValidation {
                stream: stream.to_string(),
                errors,
            });
        }

        tracker.observe(record)?;
        writer.write_record(stream, record.clone(), time_extracted)?;
        count += 1;
    }
    Ok(count)
}
