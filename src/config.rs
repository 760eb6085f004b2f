//! Configuration
//!
//! Database location and logging settings, loaded from TOML. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DomainError;

/// Directory name under the platform data/log directories
pub const APP_DIR_NAME: &str = "grocery-list";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No platform data directory available; set database.data_dir")]
    NoDataDir,
}

impl From<ConfigError> for DomainError {
    fn from(e: ConfigError) -> Self {
        DomainError::Store(e.to_string())
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroceryConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Where the item store lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory of the database file; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            file_name: "grocery.db".to_string(),
        }
    }
}

/// Rolling log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Log directory; `<data dir>/logs` when unset
    pub log_dir: Option<PathBuf>,
    pub app_name: String,
    /// One of trace, debug, info, warn, error, off
    pub level: String,
    pub max_file_bytes: u64,
    pub max_files: usize,
    /// Lines kept in memory for an in-app log view
    pub buffer_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: None,
            app_name: "GroceryList".to_string(),
            level: "info".to_string(),
            max_file_bytes: rolling_logger::DEFAULT_MAX_FILE_BYTES,
            max_files: rolling_logger::DEFAULT_MAX_FILES,
            buffer_lines: rolling_logger::DEFAULT_BUFFER_LINES,
        }
    }
}

impl GroceryConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from a file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Directory holding the database (not created here)
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    /// Full path of the database file
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.database.file_name))
    }

    pub fn log_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.logging.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("logs")),
        }
    }
}
