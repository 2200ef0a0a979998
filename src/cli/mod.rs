//! CLI module
//!
//! Command-line interface following Singer tap conventions.
//!
//! # Modes
//!
//! - `--discover` - Print the catalog of available streams
//! - `--catalog <file>` - Sync the streams selected in the catalog

mod commands;
mod runner;

pub use commands::{Cli, Mode};
pub use runner::{Runner, USAGE_HINT};
