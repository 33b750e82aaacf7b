//! File-backed credential storage.
//!
//! This module persists the bearer token from the last login in
//! credentials.json so a restarted client stays logged in.

use crate::paths::ConciergePaths;
use concierge_core::auth::Credentials;
use concierge_core::backend::CredentialProvider;
use concierge_core::error::{ConciergeError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Credential provider backed by a JSON file.
///
/// The file is read once on construction and cached; `store` and `clear`
/// write through to disk.
///
/// # Example
///
/// ```ignore
/// use concierge_infrastructure::{ConciergePaths, FileCredentialStore};
///
/// let store = FileCredentialStore::new(&ConciergePaths::new())?;
/// let token = store.bearer_token();
/// ```
#[derive(Clone)]
pub struct FileCredentialStore {
    /// Cached credentials loaded from disk.
    cached: Arc<RwLock<Option<Credentials>>>,
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(paths: &ConciergePaths) -> Result<Self> {
        let path = paths
            .credentials_file()
            .map_err(|e| ConciergeError::config(format!("Failed to get credentials path: {}", e)))?;
        Self::with_path(path)
    }

    /// Opens the store at an explicit path, loading any existing credentials.
    ///
    /// A file that cannot be parsed is ignored with a warning; the user just
    /// has to log in again.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded = read_credentials(&path)?;
        Ok(Self {
            cached: Arc::new(RwLock::new(loaded)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(credentials)?;
        let mut file = open_private(&self.path)?;
        // An existing file keeps its old mode on open.
        restrict_permissions(&self.path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    fn set_cached(&self, credentials: Option<Credentials>) -> Result<()> {
        let mut guard = self
            .cached
            .write()
            .map_err(|e| ConciergeError::internal(format!("credential lock poisoned: {e}")))?;
        *guard = credentials;
        Ok(())
    }
}

fn read_credentials(path: &Path) -> Result<Option<Credentials>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Credentials>(&content) {
        Ok(credentials) => Ok(Some(credentials)),
        Err(e) => {
            tracing::warn!(
                "[Credentials] Ignoring unreadable {}: {}",
                path.display(),
                e
            );
            Ok(None)
        }
    }
}

/// Opens `path` for writing. On unix a new file is created owner-only.
fn open_private(path: &Path) -> Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl CredentialProvider for FileCredentialStore {
    fn bearer_token(&self) -> Option<String> {
        self.credentials().map(|c| c.token)
    }

    fn credentials(&self) -> Option<Credentials> {
        self.cached.read().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, credentials: Credentials) -> Result<()> {
        self.write_file(&credentials)?;
        tracing::info!(
            "[Credentials] Stored credentials for {}",
            credentials.username.as_deref().unwrap_or("unknown user")
        );
        self.set_cached(Some(credentials))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        tracing::info!("[Credentials] Cleared stored credentials");
        self.set_cached(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ConciergePaths::with_base(temp_dir.path());

        let store = FileCredentialStore::new(&paths).unwrap();
        assert!(store.credentials().is_none());
        store
            .store(Credentials::bearer("abc").with_username("dana"))
            .unwrap();

        let reopened = FileCredentialStore::new(&paths).unwrap();
        assert_eq!(reopened.bearer_token().as_deref(), Some("abc"));
        assert_eq!(
            reopened.credentials().unwrap().username.as_deref(),
            Some("dana")
        );
    }

    #[test]
    fn test_clear_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(temp_dir.path().join("credentials.json")).unwrap();

        store.store(Credentials::bearer("abc")).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.bearer_token().is_none());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::with_path(&path).unwrap();
        assert!(store.credentials().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(temp_dir.path().join("credentials.json")).unwrap();
        store.store(Credentials::bearer("abc")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened_and_truncated() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, " ".repeat(512)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::with_path(&path).unwrap();
        store.store(Credentials::bearer("short")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let reopened = FileCredentialStore::with_path(&path).unwrap();
        assert_eq!(reopened.bearer_token().as_deref(), Some("short"));
    }
}
