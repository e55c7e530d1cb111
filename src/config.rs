//! Configuration for textdb
//!
//! Centralized configuration with sensible defaults. A config can be built in
//! code through [`ConfigBuilder`] or loaded from a JSON settings document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TextDbError};

/// Main configuration for a textdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all table files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {table}.tbl      (one file per row type)
    ///     └── {table}.tbl.tmp  (only while a flush is in progress)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Lock Configuration
    // -------------------------------------------------------------------------
    /// How long a table lock acquisition waits before failing (milliseconds)
    pub lock_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Flush Configuration
    // -------------------------------------------------------------------------
    /// When dirty tables are written back without an explicit `force_write`
    pub flush_strategy: FlushStrategy,

    /// Write dirty tables back when their store is dropped
    pub flush_on_drop: bool,
}

/// Automatic flush strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStrategy {
    /// Only `force_write`, `Database::flush_all` and drop persist changes
    Manual,

    /// Flush in the mutating thread once N changes are pending
    EveryNMutations { count: usize },

    /// Flush dirty tables from a background thread every `ms` milliseconds
    Interval { ms: u64 },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./textdb_data"),
            lock_timeout_ms: 5000,
            flush_strategy: FlushStrategy::Manual,
            flush_on_drop: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Lock timeout as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Load a config from a JSON settings file
    ///
    /// Keys that are absent keep their default value.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TextDbError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Load a config from a JSON settings document
    ///
    /// ```json
    /// { "data_dir": "/var/lib/app", "lock_timeout_ms": 2000,
    ///   "flush": { "every_n_mutations": 50 }, "flush_on_drop": true }
    /// ```
    pub fn from_json_str(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text)
            .map_err(|e| TextDbError::Config(format!("Invalid settings: {}", e)))?;
        settings.into_config()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(TextDbError::Config("data_dir must not be empty".to_string()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(TextDbError::Config(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        match self.flush_strategy {
            FlushStrategy::EveryNMutations { count: 0 } => Err(TextDbError::Config(
                "every_n_mutations must be greater than zero".to_string(),
            )),
            FlushStrategy::Interval { ms: 0 } => Err(TextDbError::Config(
                "interval_ms must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Settings Document
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    data_dir: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
    flush: Option<FlushSettings>,
    flush_on_drop: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FlushSettings {
    Manual,
    EveryNMutations(usize),
    IntervalMs(u64),
}

impl Settings {
    fn into_config(self) -> Result<Config> {
        let mut builder = Config::builder();
        if let Some(dir) = self.data_dir {
            builder = builder.data_dir(dir);
        }
        if let Some(ms) = self.lock_timeout_ms {
            builder = builder.lock_timeout_ms(ms);
        }
        if let Some(flush) = self.flush {
            builder = builder.flush_strategy(match flush {
                FlushSettings::Manual => FlushStrategy::Manual,
                FlushSettings::EveryNMutations(count) => FlushStrategy::EveryNMutations { count },
                FlushSettings::IntervalMs(ms) => FlushStrategy::Interval { ms },
            });
        }
        if let Some(flag) = self.flush_on_drop {
            builder = builder.flush_on_drop(flag);
        }
        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all table files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the table lock timeout (in milliseconds)
    pub fn lock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.lock_timeout_ms = ms;
        self
    }

    /// Set the automatic flush strategy
    pub fn flush_strategy(mut self, strategy: FlushStrategy) -> Self {
        self.config.flush_strategy = strategy;
        self
    }

    /// Enable or disable the flush performed when a store is dropped
    pub fn flush_on_drop(mut self, flag: bool) -> Self {
        self.config.flush_on_drop = flag;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
