//! Configuration management for BreatheSafe

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// WAQI API token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Fallback store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Freshness windows per caller path
    #[serde(default)]
    pub freshness: FreshnessConfig,

    /// Background scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Which fallback store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Relational store with full reading history
    #[default]
    Sqlite,
    /// Single JSON document holding the latest reading per country
    Json,
}

/// Fallback store settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Store backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Override the store location (defaults under ~/.breathesafe)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Freshness windows, in minutes, per caller path.
///
/// Interactive callers tolerate older data than the scheduler; both values
/// feed the same freshness decision, they just parameterize it differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    /// Window for interactive lookups (list, city, manual refresh)
    #[serde(default = "default_interactive_mins")]
    pub interactive_mins: u64,

    /// Window for scheduler-driven batch refreshes
    #[serde(default = "default_scheduler_mins")]
    pub scheduler_mins: u64,
}

fn default_interactive_mins() -> u64 {
    60
}

fn default_scheduler_mins() -> u64 {
    15
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            interactive_mins: default_interactive_mins(),
            scheduler_mins: default_scheduler_mins(),
        }
    }
}

impl FreshnessConfig {
    pub fn interactive(&self) -> Duration {
        Duration::from_secs(self.interactive_mins * 60)
    }

    pub fn scheduler(&self) -> Duration {
        Duration::from_secs(self.scheduler_mins * 60)
    }
}

/// Background scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Wall-clock minute offsets within each hour at which a batch runs
    #[serde(default = "default_minute_offsets")]
    pub minute_offsets: Vec<u32>,
}

fn default_minute_offsets() -> Vec<u32> {
    vec![0, 15, 30, 45]
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            minute_offsets: default_minute_offsets(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.yaml"))
    }

    /// Application home directory (~/.breathesafe)
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;
        Ok(home.join(".breathesafe"))
    }

    /// Load configuration, honoring an optional path override
    pub fn load(path_override: Option<&str>) -> Result<Self> {
        match path_override {
            Some(p) => Self::load_from(PathBuf::from(p)),
            None => Self::load_from(Self::default_path()?),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration, honoring an optional path override
    pub fn save(&self, path_override: Option<&str>) -> Result<()> {
        match path_override {
            Some(p) => self.save_to(PathBuf::from(p)),
            None => self.save_to(Self::default_path()?),
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Serialize config
        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        // Write to file
        std::fs::write(&path, contents)?;

        // Set file permissions to 600 on Unix systems (the file holds the API token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Resolve the fallback store path for the configured backend
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let file = match self.store.backend {
            StoreBackend::Sqlite => "readings.db",
            StoreBackend::Json => "fallback.json",
        };
        Ok(Self::home_dir()?.join(file))
    }

    /// Validate that the API token is present
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingApiToken.into())
    }
}
