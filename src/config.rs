//! Scheduler configuration, read from `cadence.toml`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for the scheduler service and its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CadenceConfig {
    /// How long a cached due list may be served, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Fetch-compute-swap attempts per review before giving up
    #[serde(default = "default_max_review_attempts")]
    pub max_review_attempts: u32,
    /// Due list size when the caller does not ask for one
    #[serde(default = "default_due_limit")]
    pub default_due_limit: usize,
    /// Number of due cards materialised per cached due set
    #[serde(default = "default_due_set_capacity")]
    pub due_set_capacity: usize,
    /// SQLite database holding the cards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_cache_ttl_secs() -> u64 {
    900
}

fn default_max_review_attempts() -> u32 {
    3
}

fn default_due_limit() -> usize {
    20
}

fn default_due_set_capacity() -> usize {
    500
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_review_attempts: default_max_review_attempts(),
            default_due_limit: default_due_limit(),
            due_set_capacity: default_due_set_capacity(),
            database_path: None,
        }
    }
}

impl CadenceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CadenceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_review_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_review_attempts must be at least 1".to_string(),
            ));
        }
        if self.due_set_capacity == 0 {
            return Err(ConfigError::Invalid(
                "due_set_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("cadence"))
            .ok_or(ConfigError::DataDirNotFound)
    }

    /// Configured database path, or `cards.db` in the data directory
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_data_dir()?.join("cards.db")),
        }
    }
}
