//! Configuration management for gnsslog

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::telemetry::ReopenPolicy;

/// Name of the directory under the storage root, and the prefix of every log file
pub const FILE_PREFIX: &str = "pseudoranges";

/// Ceiling on stored log files before oldest-first eviction
pub const MAX_FILES_STORED: usize = 100;

/// Files smaller than this are treated as aborted sessions
pub const MINIMUM_USABLE_FILE_SIZE_BYTES: u64 = 1000;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the storage medium; log files go to `<storage_root>/pseudoranges`.
    /// A leading `~` is expanded.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// Maximum log files kept by the retention sweep (default: 100)
    #[serde(default = "default_max_files_stored")]
    pub max_files_stored: usize,

    /// Files below this size are deleted by the retention sweep (default: 1000)
    #[serde(default = "default_minimum_usable_file_size_bytes")]
    pub minimum_usable_file_size_bytes: u64,

    /// Evict oldest files once more than `max_files_stored` exist
    #[serde(default = "default_true")]
    pub evict_by_count: bool,

    /// What starting an already-open session does: "rotate" or "reject"
    #[serde(default)]
    pub reopen_policy: ReopenPolicy,

    /// Only fixes from this provider are logged
    #[serde(default = "default_expected_provider")]
    pub expected_provider: String,

    /// Write version and column comments at the top of each file
    #[serde(default = "default_true")]
    pub write_header: bool,

    /// Seconds between retention sweeps while logging, 0 to disable (default: 300 = 5 min)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_storage_root() -> String {
    "~".to_string()
}

fn default_max_files_stored() -> usize {
    MAX_FILES_STORED
}

fn default_minimum_usable_file_size_bytes() -> u64 {
    MINIMUM_USABLE_FILE_SIZE_BYTES
}

fn default_true() -> bool {
    true
}

fn default_expected_provider() -> String {
    crate::telemetry::GPS_PROVIDER.to_string()
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            max_files_stored: default_max_files_stored(),
            minimum_usable_file_size_bytes: default_minimum_usable_file_size_bytes(),
            evict_by_count: true,
            reopen_policy: ReopenPolicy::default(),
            expected_provider: default_expected_provider(),
            write_header: true,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file, or return default if not found
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Storage root with `~` expanded
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage_root).into_owned())
    }
}

/// Get the base configuration directory (~/.gnsslog)
/// Falls back to ./.gnsslog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".gnsslog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gnsslog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the diagnostics logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}
