//! Stream selection
//!
//! Streams chosen for emission drag their ancestors into the active set:
//! a child can only be requested with ids produced by its parent.

use super::flatten::FlatStreams;
use crate::error::{Error, Result};
use std::collections::HashSet;

/// The streams a run touches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    /// Streams that are synced, in parent-before-child order
    active: Vec<String>,
    /// Streams whose records are emitted
    selected: HashSet<String>,
}

impl SelectionSet {
    /// Expand selected streams with their full ancestor chains
    ///
    /// Unknown stream names are rejected.
    pub fn expand<I, S>(flat: &FlatStreams<'_>, selected: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected: HashSet<String> = selected.into_iter().map(Into::into).collect();

        let mut required: HashSet<&str> = HashSet::new();
        for name in &selected {
            if !flat.contains(name) {
                return Err(Error::StreamNotFound {
                    stream: name.clone(),
                });
            }
            required.insert(name.as_str());
            required.extend(flat.ancestors(name));
        }

        let active = flat
            .names()
            .iter()
            .filter(|name| required.contains(*name))
            .map(|name| (*name).to_string())
            .collect();

        Ok(Self { active, selected })
    }

    /// Whether a stream is synced (selected or an ancestor of one)
    pub fn is_active(&self, stream: &str) -> bool {
        self.active.iter().any(|s| s == stream)
    }

    /// Whether a stream's records are emitted
    pub fn is_selected(&self, stream: &str) -> bool {
        self.selected.contains(stream)
    }

    /// Active streams, parents before children
    pub fn active(&self) -> &[String] {
        &self.active
    }

    /// Streams selected for emission
    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
