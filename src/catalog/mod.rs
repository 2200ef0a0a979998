//! Stream catalog module
//!
//! Static, declarative description of the streams the tap can extract.
//!
//! # Overview
//!
//! The catalog module provides:
//! - `StreamDefinition` - Endpoint, keys, replication mode and children
//! - `flatten` - Name-indexed view of the tree with parent links
//! - `SelectionSet` - Selected streams expanded with their ancestors
//! - YAML loading with validation of the stream tree

mod flatten;
mod loader;
mod selection;
mod types;

pub use flatten::{flatten, FlatStream, FlatStreams};
pub use loader::{builtin_streams, load_streams_from_str, validate_catalog, AWIN_STREAMS_YAML};
pub use selection::SelectionSet;
pub use types::{DateWindowFields, StreamCatalog, StreamDefinition, PARENT_ID_PLACEHOLDER};
