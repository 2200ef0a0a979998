//! Schema module
//!
//! Stream schemas, the Singer catalog and record validation.
//!
//! # Features
//!
//! - **Embedded Schemas**: JSON schemas for every built-in stream
//! - **Discovery**: Catalog generation from the stream tree
//! - **Selection**: Operator stream selection via catalog metadata
//! - **Validation**: Records are checked before they are emitted

mod catalog;
mod validate;

pub use catalog::{builtin_schema, discover, Catalog, CatalogEntry, MetadataEntry};
pub use validate::validate;
