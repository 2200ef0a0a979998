//! Flattened view of the stream tree
//!
//! Maps every stream name to its definition and its immediate parent, so
//! ancestor chains can be computed without re-walking the tree.

use super::types::StreamDefinition;
use std::collections::HashMap;

/// A stream together with its immediate parent's name
#[derive(Debug, Clone, Copy)]
pub struct FlatStream<'a> {
    /// The stream definition
    pub definition: &'a StreamDefinition,
    /// Immediate parent stream, `None` for roots
    pub parent: Option<&'a str>,
}

/// Every stream in the tree, indexed by name, in pre-order
#[derive(Debug, Clone, Default)]
pub struct FlatStreams<'a> {
    order: Vec<&'a str>,
    by_name: HashMap<&'a str, FlatStream<'a>>,
}

impl<'a> FlatStreams<'a> {
    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Option<&FlatStream<'a>> {
        self.by_name.get(name)
    }

    /// Whether the tree contains a stream
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Immediate parent of a stream
    pub fn parent_of(&self, name: &str) -> Option<&'a str> {
        self.by_name.get(name).and_then(|s| s.parent)
    }

    /// Ancestors of a stream, nearest first
    pub fn ancestors(&self, name: &str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(name);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent_of(parent);
        }
        chain
    }

    /// Stream names in pre-order (every parent before its children)
    pub fn names(&self) -> &[&'a str] {
        &self.order
    }

    /// Streams in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &FlatStream<'a>)> + '_ {
        self.order
            .iter()
            .filter_map(move |name| self.by_name.get(name).map(|s| (*name, s)))
    }

    /// Number of streams
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the tree is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Flatten a stream tree
///
/// Stream names must be unique across the tree; the loader enforces this.
/// On a duplicate the later definition wins.
pub fn flatten(streams: &[StreamDefinition]) -> FlatStreams<'_> {
    let mut flat = FlatStreams::default();
    for stream in streams {
        visit(stream, None, &mut flat);
    }
    flat
}

fn visit<'a>(stream: &'a StreamDefinition, parent: Option<&'a str>, flat: &mut FlatStreams<'a>) {
    let name = stream.name.as_str();
    if flat
        .by_name
        .insert(
            name,
            FlatStream {
                definition: stream,
                parent,
            },
        )
        .is_none()
    {
        flat.order.push(name);
    }

    for child in &stream.children {
        visit(child, Some(name), flat);
    }
}
