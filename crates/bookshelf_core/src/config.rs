//! Catalog configuration.
//!
//! Settings are loaded once at startup and passed down explicitly; nothing in
//! core reads a global database location.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database file used when nothing else is configured.
pub const DEFAULT_DB_PATH: &str = "books.db";
/// Export target used when the caller names none.
pub const DEFAULT_EXPORT_PATH: &str = "books_export.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

/// Resolved runtime settings.
///
/// Every key is optional in the TOML file; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub export_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Replaces the database location, e.g. from a command-line flag.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}
