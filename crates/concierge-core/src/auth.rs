//! Authentication domain models.

use crate::backend::CredentialProvider;
use crate::error::{ConciergeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Bearer credential issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Who logged in; informational only.
    #[serde(default)]
    pub username: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: default_token_type(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Role of an account on the recommendation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Account as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Credential provider that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    credentials: RwLock<Option<Credentials>>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

impl CredentialProvider for InMemoryCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.credentials().map(|c| c.token)
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, credentials: Credentials) -> Result<()> {
        let mut guard = self
            .credentials
            .write()
            .map_err(|e| ConciergeError::internal(format!("credential lock poisoned: {e}")))?;
        *guard = Some(credentials);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .credentials
            .write()
            .map_err(|e| ConciergeError::internal(format!("credential lock poisoned: {e}")))?;
        *guard = None;
        Ok(())
    }
}
