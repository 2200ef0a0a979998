//! CLI commands and argument parsing

use clap::Parser;
use std::path::PathBuf;

/// AWIN advertiser tap
///
/// Run with `--discover` to print a catalog, then select streams in it and
/// run with `--catalog` to sync.
#[derive(Parser, Debug)]
#[command(name = "awin-advertiser-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// State file (JSON) from a previous run
    #[arg(short, long, conflicts_with = "state_json")]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long)]
    pub state_json: Option<String>,

    /// Catalog file with selected streams
    #[arg(long, alias = "properties")]
    pub catalog: Option<PathBuf>,

    /// Print the catalog of available streams and exit
    #[arg(short, long)]
    pub discover: bool,

    /// Also write state to this file after every update
    #[arg(long)]
    pub state_output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a run does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the catalog
    Discover,
    /// Sync the streams selected in a catalog file
    Sync {
        /// Catalog file
        catalog: PathBuf,
    },
}

impl Cli {
    /// The mode selected by the flags, if any
    pub fn mode(&self) -> Option<Mode> {
        if self.discover {
            return Some(Mode::Discover);
        }
        self.catalog
            .clone()
            .map(|catalog| Mode::Sync { catalog })
    }
}
