//! Unified path management for concierge configuration files.
//!
//! ```text
//! ~/.config/concierge/         # Config directory
//! ├── config.toml              # Client configuration
//! ├── credentials.json         # Bearer token from the last login
//! └── logs/                    # Application logs
//!     └── concierge.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

const APP_DIR: &str = "concierge";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves every file the client reads or writes.
///
/// By default paths live under the platform config directory; `with_base`
/// roots them somewhere else (tests, portable installs).
#[derive(Debug, Clone, Default)]
pub struct ConciergePaths {
    base: Option<PathBuf>,
}

impl ConciergePaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: Some(base.as_ref().to_path_buf()),
        }
    }

    /// Returns the concierge configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: e.g. `~/.config/concierge/`
    /// - `Err(PathError::ConfigDirNotFound)`: no base given and no platform config dir
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Path to the stored bearer credential.
    ///
    /// # Security Note
    ///
    /// The credential store writes this file with 600 permissions on Unix.
    pub fn credentials_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("credentials.json"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_custom_base() {
        let paths = ConciergePaths::with_base("/tmp/concierge-test");
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/concierge-test/config.toml")
        );
        assert_eq!(
            paths.credentials_file().unwrap(),
            PathBuf::from("/tmp/concierge-test/credentials.json")
        );
        assert_eq!(
            paths.logs_dir().unwrap(),
            PathBuf::from("/tmp/concierge-test/logs")
        );
    }
}
