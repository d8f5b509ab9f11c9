//! Configuration management for daylog

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::{LogLevel, DEFAULT_RETENTION_DAYS};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "daylog.toml";

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Minimum severity written to log files: "debug", "info", "warn" or "error".
    /// Case-insensitive; anything else means "info".
    #[serde(default)]
    pub level: LogLevel,

    /// Call frames to skip when attributing a record to its origin (default: 1)
    #[serde(default = "default_caller_skip")]
    pub caller_skip: usize,

    /// Root directory holding one sub-directory per day (default: ./logs)
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Days of partitions to keep; zero or less disables cleanup (default: 7)
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Run the background retention sweeper (default: true)
    #[serde(default = "default_auto_clean")]
    pub auto_clean: bool,

    /// Flush every stream to disk after each record (default: false)
    #[serde(default)]
    pub flush_on_write: bool,
}

fn default_caller_skip() -> usize {
    1
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_auto_clean() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            caller_skip: default_caller_skip(),
            base_dir: default_base_dir(),
            retention_days: default_retention_days(),
            auto_clean: default_auto_clean(),
            flush_on_write: false,
        }
    }
}

impl LoggerConfig {
    /// Build a configuration from the six construction parameters
    ///
    /// `level` is parsed case-insensitively and falls back to "info".
    pub fn new(
        level: &str,
        caller_skip: usize,
        base_dir: impl Into<PathBuf>,
        retention_days: i64,
        auto_clean: bool,
        flush_on_write: bool,
    ) -> Self {
        Self {
            level: LogLevel::parse_lenient(level),
            caller_skip,
            base_dir: base_dir.into(),
            retention_days,
            auto_clean,
            flush_on_write,
        }
    }

    /// Load configuration from file, or return default if not found
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Whether the retention sweeper should run
    pub fn sweeper_enabled(&self) -> bool {
        self.auto_clean && self.retention_days > 0
    }
}
