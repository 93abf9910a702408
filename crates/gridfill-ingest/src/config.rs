//! Pipeline configuration.

use chrono::NaiveDate;
use directories::ProjectDirs;
use gridfill_fetch::{BmrsSource, ClientConfig, Endpoint, FetchClient};
use gridfill_types::SourceId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cycle::CycleSettings;
use crate::planner::BackfillPlanner;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Settings of the acquisition pipeline.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base source identifier of stored series.
    pub source_id: String,
    /// Reporting API dataset.
    pub dataset: String,
    /// Reporting API base URL.
    pub base_url: String,
    /// Optional API key.
    pub api_key: Option<String>,
    /// Seconds between cycle triggers.
    pub interval_secs: u64,
    /// Days per planned window.
    pub lookback_days: u32,
    /// Earliest settlement date to acquire.
    pub floor_date: NaiveDate,
    /// Windows processed per cycle.
    pub max_windows_per_cycle: u32,
    /// Concurrent store writes.
    pub store_concurrency: usize,
    /// Concurrent day requests within a window.
    pub fetch_concurrency: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry attempts per request.
    pub max_retries: u32,
    /// Store root; the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_id: "B1620".to_string(),
            dataset: gridfill_fetch::url::DEFAULT_DATASET.to_string(),
            base_url: gridfill_fetch::url::BASE_URL.to_string(),
            api_key: None,
            interval_secs: 24 * 60 * 60,
            lookback_days: 7,
            floor_date: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or(NaiveDate::MIN),
            max_windows_per_cycle: 1,
            store_concurrency: 8,
            fetch_concurrency: 4,
            timeout_secs: 60,
            max_retries: 5,
            data_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration file and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("interval_secs", self.interval_secs == 0),
            ("lookback_days", self.lookback_days == 0),
            ("max_windows_per_cycle", self.max_windows_per_cycle == 0),
            ("store_concurrency", self.store_concurrency == 0),
            ("fetch_concurrency", self.fetch_concurrency == 0),
            ("timeout_secs", self.timeout_secs == 0),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        if self.dataset.trim().is_empty() {
            return Err(ConfigError::Invalid("dataset must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        self.source_id()?;
        Ok(())
    }

    /// Returns the normalized source identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the identifier is empty.
    pub fn source_id(&self) -> Result<SourceId, ConfigError> {
        SourceId::new(&self.source_id)
            .map_err(|e| ConfigError::Invalid(format!("source_id: {e}")))
    }

    /// Returns the trigger interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the store root, falling back to [`Self::default_data_dir`].
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::default_data_dir)
    }

    /// Returns the default store root.
    ///
    /// Uses the `directories` crate to find the appropriate location:
    /// - Linux: `~/.local/share/gridfill/`
    /// - macOS: `~/Library/Application Support/gridfill/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\gridfill\`
    ///
    /// Falls back to `~/.gridfill/` if the platform-specific location
    /// cannot be determined.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        ProjectDirs::from("", "", "gridfill").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Builds the backfill planner.
    #[must_use]
    pub fn planner(&self) -> BackfillPlanner {
        BackfillPlanner::new(self.lookback_days, self.floor_date)
    }

    /// Builds the cycle settings.
    #[must_use]
    pub const fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            max_windows: self.max_windows_per_cycle,
            store_concurrency: self.store_concurrency,
        }
    }

    /// Builds the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            concurrency: self.fetch_concurrency,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..ClientConfig::default()
        }
    }

    /// Returns the dataset endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            dataset: self.dataset.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// Builds the reporting API source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn source(&self) -> Result<BmrsSource, ConfigError> {
        let client =
            FetchClient::new(self.client_config()).map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(BmrsSource::new(client, self.endpoint()))
    }
}

/// Fallback when the platform data directory is unknown.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".gridfill")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval(), Duration::from_secs(86_400));
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.floor_date, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(config.source_id().unwrap().as_str(), "B1620");
        assert_eq!(config.endpoint().dataset, "AGPT");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gridfill.json");
        fs::write(
            &path,
            r#"{"lookback_days": 3, "floor_date": "2020-06-01", "data_dir": "/srv/gridfill"}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.lookback_days, 3);
        assert_eq!(config.floor_date, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert_eq!(config.data_dir(), PathBuf::from("/srv/gridfill"));
        assert_eq!(config.interval_secs, 86_400);
        assert_eq!(config.planner().lookback_days(), 3);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            PipelineConfig::load(&missing),
            Err(ConfigError::ReadFile { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "lookback_days = 3").unwrap();
        assert!(matches!(
            PipelineConfig::load(&garbage),
            Err(ConfigError::Parse { .. })
        ));

        let zero = dir.path().join("zero.json");
        fs::write(&zero, r#"{"lookback_days": 0}"#).unwrap();
        let err = PipelineConfig::load(&zero).unwrap_err();
        assert!(err.to_string().contains("lookback_days"));
    }

    #[test]
    fn test_validate_rejects_zero_and_bad_values() {
        for config in [
            PipelineConfig { interval_secs: 0, ..PipelineConfig::default() },
            PipelineConfig { store_concurrency: 0, ..PipelineConfig::default() },
            PipelineConfig { fetch_concurrency: 0, ..PipelineConfig::default() },
            PipelineConfig { source_id: "  ".to_string(), ..PipelineConfig::default() },
            PipelineConfig { base_url: "ftp://example".to_string(), ..PipelineConfig::default() },
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_derived_settings() {
        let config = PipelineConfig {
            base_url: "http://localhost:8080/".to_string(),
            api_key: Some(String::new()),
            fetch_concurrency: 2,
            max_windows_per_cycle: 5,
            ..PipelineConfig::default()
        };

        let endpoint = config.endpoint();
        assert_eq!(endpoint.base_url, "http://localhost:8080");
        assert_eq!(endpoint.api_key, None);
        assert_eq!(config.client_config().concurrency, 2);
        assert_eq!(config.cycle_settings().max_windows, 5);
        assert!(config.source().is_ok());
    }

    #[test]
    fn test_default_data_dir_is_named() {
        let path = PipelineConfig::default_data_dir();
        assert!(path.to_string_lossy().contains("gridfill"));
    }
}
