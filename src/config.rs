//! Configuration for hashcards.
//!
//! Looked up in order: an explicit path, `<cards_dir>/hashcards.toml`, the
//! user config directory (`hashcards/config.toml`), then built-in defaults.
//!
//! ```toml
//! database = "/home/me/.local/share/hashcards/math.db"
//! session_limit = 50
//!
//! [scheduler]
//! request_retention = 0.85
//! maximum_interval = 365
//! learning_steps = [1, 10]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::SchedulerParams;

/// File name looked up inside the cards directory
pub const CONFIG_FILE_NAME: &str = "hashcards.toml";

/// Default database file name, relative to the cards directory
pub const DEFAULT_DATABASE_NAME: &str = ".hashcards.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashcardsConfig {
    /// SQLite file for schedules; defaults to `.hashcards.db` in the cards
    /// directory. Relative paths resolve against the cards directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    pub scheduler: SchedulerParams,
    /// Maximum number of reviews in one drill session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_limit: Option<usize>,
}

impl HashcardsConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find and load the configuration that applies to `cards_dir`
    pub fn load(explicit: Option<&Path>, cards_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = [
            Some(cards_dir.join(CONFIG_FILE_NAME)),
            user_config_path(),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate().map_err(ConfigError::Invalid)?;
        if self.session_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "session_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database location for a cards directory
    pub fn database_path(&self, cards_dir: &Path) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cards_dir.join(path),
            None => cards_dir.join(DEFAULT_DATABASE_NAME),
        }
    }
}

/// `hashcards/config.toml` in the platform config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hashcards").join("config.toml"))
}
