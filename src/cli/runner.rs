//! CLI runner - executes the selected mode

use crate::catalog::{builtin_streams, StreamCatalog};
use crate::cli::commands::{Cli, Mode};
use crate::config::TapConfig;
use crate::engine::{SyncContext, SyncStats};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::output::{MessageWriter, SingerWriter};
use crate::schema::{discover, Catalog};
use crate::state::{FileStateSink, StateManager};
use std::path::Path;
use tracing::info;

/// Printed when neither `--discover` nor `--catalog` is given
pub const USAGE_HINT: &str = "No mode selected: run with --discover to print the catalog, \
     then mark streams as selected and run with --catalog <file>";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected mode
    pub async fn run(&self) -> Result<()> {
        let config = TapConfig::from_file(&self.cli.config)?;
        let streams = builtin_streams()?;

        match self.cli.mode() {
            Some(Mode::Discover) => self.discover(&streams),
            Some(Mode::Sync { catalog }) => self.sync(config, &streams, &catalog).await,
            None => Err(Error::config(USAGE_HINT)),
        }
    }

    /// Print the catalog of every stream
    fn discover(&self, streams: &StreamCatalog) -> Result<()> {
        info!("Starting discover");
        let catalog = discover(streams)?;
        println!("{}", catalog.to_json_pretty()?);
        info!(streams = catalog.streams.len(), "Finished discover");
        Ok(())
    }

    /// Sync the streams selected in `catalog_path`, writing Singer messages to stdout
    async fn sync(
        &self,
        config: TapConfig,
        streams: &StreamCatalog,
        catalog_path: &Path,
    ) -> Result<()> {
        let catalog = Catalog::from_file(catalog_path)?;
        let state = self.load_state()?.with_sink(SingerWriter::stdout());

        let stats = self
            .sync_with(config, streams, catalog, state, SingerWriter::stdout())
            .await?;
        info!(records = stats.total_records(), "Finished sync");
        Ok(())
    }

    /// Run a sync with an explicit output writer
    ///
    /// `--state-output`, when given, is attached to `state` as an extra sink.
    pub async fn sync_with(
        &self,
        config: TapConfig,
        streams: &StreamCatalog,
        catalog: Catalog,
        mut state: StateManager,
        writer: impl MessageWriter + 'static,
    ) -> Result<SyncStats> {
        if let Some(path) = &self.cli.state_output {
            state.add_sink(FileStateSink::new(path));
        }

        let client = HttpClient::with_config(config.http_config())?;
        let mut context = SyncContext::new(client, config, catalog, state, writer);
        context.sync(streams).await
    }

    /// Load state
    pub fn load_state(&self) -> Result<StateManager> {
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
                .with_context(|| format!("Failed to load state '{}'", path.display()))
        } else {
            Ok(StateManager::in_memory())
        }
    }
}
