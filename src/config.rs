//! Logger configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::level::{Level, LevelSet};

/// Name of the archive subdirectory used when none is configured
pub const DEFAULT_ARCHIVE_DIR_NAME: &str = "archived";

/// Logger configuration, usually loaded as part of the server config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggerConfig {
    /// IANA timezone for timestamps and day files; the host zone when unset
    #[serde(default)]
    pub timezone: Option<String>,

    /// Decorate console output with ANSI colors (never persisted)
    #[serde(default = "default_true")]
    pub colorful_logs: bool,

    /// Write records to day files
    #[serde(default = "default_true")]
    pub write_logs_to_file: bool,

    /// Levels printed to the console: "all" or a list of level names
    #[serde(default = "default_console_log_levels")]
    pub console_log_levels: LevelSet,

    /// Levels written to disk: "all" or a list of level names
    #[serde(default = "default_log_file_levels")]
    pub log_file_levels: LevelSet,

    /// Directory holding day files
    #[serde(default = "default_log_file_dir_path")]
    pub log_file_dir_path: PathBuf,

    /// Directory receiving compressed files (default: `<log dir>/archived`)
    #[serde(default)]
    pub log_file_archive_dir_path: Option<PathBuf>,

    /// Age in days after which day files are archived or deleted; 0 or less disables retention
    #[serde(default = "default_log_file_max_age")]
    pub log_file_max_age: i64,

    /// Archive expired files instead of deleting them
    #[serde(default = "default_true")]
    pub archive_logs: bool,
}

fn default_true() -> bool {
    true
}

fn default_console_log_levels() -> LevelSet {
    LevelSet::only([Level::Info, Level::Notice, Level::Warn, Level::Error])
}

fn default_log_file_levels() -> LevelSet {
    LevelSet::All
}

fn default_log_file_dir_path() -> PathBuf {
    PathBuf::from(".logs")
}

fn default_log_file_max_age() -> i64 {
    7
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            colorful_logs: true,
            write_logs_to_file: true,
            console_log_levels: default_console_log_levels(),
            log_file_levels: default_log_file_levels(),
            log_file_dir_path: default_log_file_dir_path(),
            log_file_archive_dir_path: None,
            log_file_max_age: default_log_file_max_age(),
            archive_logs: true,
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a TOML file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read logger config")?;
            toml::from_str(&content).context("Failed to parse logger config")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize logger config")?;
        std::fs::write(path, content).context("Failed to write logger config")?;
        Ok(())
    }

    /// Resolved archive directory
    pub fn archive_dir(&self) -> PathBuf {
        self.log_file_archive_dir_path
            .clone()
            .unwrap_or_else(|| self.log_file_dir_path.join(DEFAULT_ARCHIVE_DIR_NAME))
    }

    /// Whether the retention manager should run
    pub fn retention_enabled(&self) -> bool {
        self.write_logs_to_file && self.log_file_max_age > 0
    }
}
