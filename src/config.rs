use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::diagnostics::DEFAULT_CAPACITY;
use crate::storage::queries::DEFAULT_TABLE;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file.
    pub database: PathBuf,
    pub table: String,
    pub log_level: String,
    /// Records kept by the in-memory diagnostics view.
    pub log_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("lexicon.db"),
            table: DEFAULT_TABLE.to_string(),
            log_level: "info".to_string(),
            log_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Loads the config file, then applies environment overrides.
    ///
    /// Without an explicit path, `config.json` next to the executable is used.
    /// A missing file yields the defaults; an unreadable or invalid one is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database) = lookup("LEXICON_DATABASE").filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(database);
        }
        if let Some(table) = lookup("LEXICON_TABLE").filter(|v| !v.is_empty()) {
            self.table = table;
        }
        if let Some(level) = lookup("RUST_LOG").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
