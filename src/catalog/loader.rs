//! YAML loader for the stream tree
//!
//! Parses and validates stream definitions. The AWIN tree is embedded in the
//! binary; custom trees can be loaded from a string for testing or reuse.

use super::types::{StreamCatalog, StreamDefinition, PARENT_ID_PLACEHOLDER};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Embedded AWIN advertiser stream tree
pub const AWIN_STREAMS_YAML: &str = include_str!("../../streams/awin.yaml");

/// Load the built-in AWIN stream tree
pub fn builtin_streams() -> Result<StreamCatalog> {
    load_streams_from_str(AWIN_STREAMS_YAML)
}

/// Load a stream tree from a YAML string
pub fn load_streams_from_str(yaml: &str) -> Result<StreamCatalog> {
    let catalog: StreamCatalog = serde_yaml::from_str(yaml)
        .map_err(|e| Error::catalog(format!("Failed to parse stream YAML: {e}")))?;

    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Validate a whole stream tree
pub fn validate_catalog(catalog: &StreamCatalog) -> Result<()> {
    if catalog.streams.is_empty() {
        return Err(Error::catalog("Stream tree must have at least one stream"));
    }

    let mut seen = HashSet::new();
    for stream in &catalog.streams {
        validate_tree(stream, false, &mut seen)?;
    }
    Ok(())
}

fn validate_tree<'a>(
    stream: &'a StreamDefinition,
    is_child: bool,
    seen: &mut HashSet<&'a str>,
) -> Result<()> {
    validate_stream(stream, is_child)?;

    // Flattening keys streams by name, so names must be unique tree-wide
    if !seen.insert(stream.name.as_str()) {
        return Err(Error::catalog(format!(
            "Duplicate stream name '{}'",
            stream.name
        )));
    }

    for child in &stream.children {
        validate_tree(child, true, seen)?;
    }
    Ok(())
}

/// Validate a single stream definition
fn validate_stream(stream: &StreamDefinition, is_child: bool) -> Result<()> {
    if stream.name.is_empty() {
        return Err(Error::catalog("Stream name cannot be empty"));
    }

    if stream.path.is_empty() {
        return Err(Error::catalog(format!(
            "Stream '{}' path cannot be empty",
            stream.name
        )));
    }

    if stream.primary_key.is_empty() {
        return Err(Error::catalog(format!(
            "Stream '{}' must declare at least one primary key field",
            stream.name
        )));
    }

    match (stream.is_incremental(), stream.bookmark_field.is_some()) {
        (true, false) => {
            return Err(Error::catalog(format!(
                "Incremental stream '{}' must declare a bookmark_field",
                stream.name
            )));
        }
        (false, true) => {
            return Err(Error::catalog(format!(
                "Full table stream '{}' cannot declare a bookmark_field",
                stream.name
            )));
        }
        _ => {}
    }

    if stream.date_window.is_some() && stream.bookmark_field.is_none() {
        return Err(Error::catalog(format!(
            "Stream '{}' declares date window fields without a bookmark_field",
            stream.name
        )));
    }

    if stream.date_window_size_days == Some(0) {
        return Err(Error::catalog(format!(
            "Stream '{}' date_window_size_days must be at least 1",
            stream.name
        )));
    }

    // Per-parent bookmark keys are built from the parent field
    if is_child && stream.bookmark_field.is_some() && stream.parent_field.is_none() {
        return Err(Error::catalog(format!(
            "Incremental child stream '{}' must declare a parent_field",
            stream.name
        )));
    }

    if stream.path.contains(PARENT_ID_PLACEHOLDER) && !is_child {
        return Err(Error::catalog(format!(
            "Root stream '{}' path cannot reference {PARENT_ID_PLACEHOLDER}",
            stream.name
        )));
    }

    Ok(())
}
