// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # AWIN Advertiser Tap
//!
//! Incremental extractor for the AWIN advertiser API. Streams are read as a
//! parent/child tree (accounts, then per-account publishers and
//! transactions) and emitted as Singer SCHEMA, RECORD and STATE messages.
//!
//! ## Features
//!
//! - **Declarative streams**: The stream tree is described in YAML and
//!   embedded in the binary
//! - **Date windows**: Transactions are read in bounded windows, re-scanning
//!   the attribution period on every run
//! - **Per-parent bookmarks**: Child streams keep one bookmark per parent id
//! - **Retry and rate limiting**: Exponential backoff, AWIN's
//!   `request.limit.exceeded` handling and a client-side request budget
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use awin_advertiser_tap::{
//!     builtin_streams, discover, HttpClient, SingerWriter, StateManager, SyncContext,
//!     TapConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> awin_advertiser_tap::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let streams = builtin_streams()?;
//!     let catalog = discover(&streams)?.with_selected(&["accounts", "transactions"]);
//!
//!     let client = HttpClient::with_config(config.http_config())?;
//!     let state = StateManager::from_file("state.json")?.with_sink(SingerWriter::stdout());
//!     let mut context = SyncContext::new(client, config, catalog, state, SingerWriter::stdout());
//!     context.sync(&streams).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SyncContext                         │
//! │  sync() → sync_endpoint(root) → sync_endpoint(child, id)…   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────┬───────────┬──────┴──────┬────────────┬───────────┐
//! │ Catalog  │   HTTP    │   Window    │   State    │  Output   │
//! ├──────────┼───────────┼─────────────┼────────────┼───────────┤
//! │ YAML     │ Bearer    │ Attribution │ Bookmarks  │ SCHEMA    │
//! │ Flatten  │ Retry     │ Planner     │ Sinks      │ RECORD    │
//! │ Select   │ Rate Limit│             │            │ STATE     │
//! └──────────┴───────────┴─────────────┴────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Stream tree definitions
pub mod catalog;

/// Tap configuration
pub mod config;

/// HTTP client with retry and rate limiting
pub mod http;

/// Date-window planning
pub mod window;

/// Key normalization
pub mod normalize;

/// Schemas, validation and the Singer catalog
pub mod schema;

/// Bookmark state and persistence
pub mod state;

/// Singer message output
pub mod output;

/// Sync engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{builtin_streams, StreamCatalog, StreamDefinition};
pub use config::TapConfig;
pub use engine::{SyncContext, SyncStats};
pub use http::{HttpClient, HttpClientConfig, Transport};
pub use output::{MemoryWriter, Message, MessageWriter, SingerWriter};
pub use schema::{discover, Catalog};
pub use state::{FileStateSink, StateManager, SyncState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
