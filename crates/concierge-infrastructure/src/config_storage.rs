//! Client configuration file storage.
//!
//! Reads `config.toml` and layers environment overrides on top:
//! - `CONCIERGE_API_URL`: service base URL
//! - `CONCIERGE_TIMEOUT_SECS`: transport timeout in seconds
//! - `CONCIERGE_LOG`: default log filter

use crate::paths::ConciergePaths;
use concierge_core::config::ClientConfig;
use concierge_core::error::{ConciergeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_API_URL: &str = "CONCIERGE_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CONCIERGE_TIMEOUT_SECS";
pub const ENV_LOG: &str = "CONCIERGE_LOG";

/// Storage for the client configuration file.
///
/// Responsibilities:
/// - Load config.toml, treating a missing or empty file as defaults
/// - Apply environment overrides
/// - Write a default file on first run
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(paths: &ConciergePaths) -> Result<Self> {
        let path = paths
            .config_file()
            .map_err(|e| ConciergeError::config(e.to_string()))?;
        Ok(Self { path })
    }

    /// Creates a ConfigStorage with a custom path (for testing).
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file only, without environment overrides.
    pub fn load_file(&self) -> Result<ClientConfig> {
        if !self.path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", self.path.display());
            return Ok(ClientConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ClientConfig::default());
        }

        let config = toml::from_str(&content).map_err(|e| {
            ConciergeError::config(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads the file and applies overrides from the process environment.
    pub fn load(&self) -> Result<ClientConfig> {
        let config = self.load_file()?;
        apply_env_overrides(config, |key| std::env::var(key).ok())
    }

    /// Writes the default configuration if no file exists yet.
    ///
    /// Returns `true` when a file was created.
    pub fn ensure_default(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&ClientConfig::default())?;
        tracing::info!("[Config] Wrote default configuration to {}", self.path.display());
        Ok(true)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: ClientConfig, lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
        let secs = raw.trim().parse::<u64>().map_err(|_| {
            ConciergeError::config(format!("{ENV_TIMEOUT_SECS} must be a number of seconds, got '{raw}'"))
        })?;
        config.api.request_timeout_secs = (secs > 0).then_some(secs);
    }

    if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
        config.log.level = level;
    }

    Ok(config)
}
