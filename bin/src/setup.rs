//! Configuration loading, logging and store setup shared by the commands.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use gridfill_lib::{CycleRunner, FileStore, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::PlanArgs;

/// Initialise logging to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
pub(crate) fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("warning: logging disabled: {e}");
    }
}

/// Command line values that override the configuration file.
#[derive(Default)]
pub(crate) struct Overrides {
    pub(crate) config: Option<PathBuf>,
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) api_key: Option<String>,
    pub(crate) plan: PlanArgs,
    pub(crate) interval_secs: Option<u64>,
    pub(crate) max_windows: Option<u32>,
}

impl Overrides {
    pub(crate) fn with_plan(self, plan: PlanArgs) -> Self {
        Self { plan, ..self }
    }

    pub(crate) fn with_cycle(self, interval_secs: Option<u64>, max_windows: Option<u32>) -> Self {
        Self {
            interval_secs,
            max_windows,
            ..self
        }
    }

    /// Reads the configuration file (if any), applies the overrides and
    /// validates the result.
    pub(crate) fn load(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(days) = self.plan.lookback_days {
            config.lookback_days = days;
        }
        if let Some(floor) = self.plan.floor_date {
            config.floor_date = NaiveDate::parse_from_str(&floor, "%Y-%m-%d")
                .with_context(|| format!("Invalid floor date '{floor}', expected YYYY-MM-DD"))?;
        }
        if let Some(secs) = self.interval_secs {
            config.interval_secs = secs;
        }
        if let Some(windows) = self.max_windows {
            config.max_windows_per_cycle = windows;
        }

        config.validate().context("Invalid configuration")?;
        debug!(
            data_dir = %config.data_dir().display(),
            dataset = %config.dataset,
            lookback_days = config.lookback_days,
            floor = %config.floor_date,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Opens the record store under the configured data directory.
pub(crate) fn open_store(config: &PipelineConfig) -> Result<Arc<FileStore>> {
    let dir = config.data_dir();
    let store = FileStore::new(dir.clone())
        .with_context(|| format!("Failed to open store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

/// Builds a cycle runner over the file store and the reporting API.
pub(crate) fn build_runner(config: &PipelineConfig) -> Result<CycleRunner> {
    let store = open_store(config)?;
    let source = config.source().context("Failed to create API client")?;

    Ok(CycleRunner::new(
        store,
        Arc::new(source),
        config.planner(),
        config.source_id()?,
        config.cycle_settings(),
    ))
}
