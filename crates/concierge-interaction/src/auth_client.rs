//! Login, registration and the current-account lookup.

use crate::transport::HttpTransport;
use crate::wire::{LoginRequest, RegisterRequest, TokenBody, UserBody};
use concierge_core::auth::{Credentials, UserProfile};
use concierge_core::backend::CredentialProvider;
use concierge_core::error::{ConciergeError, Result};
use reqwest::Method;

/// Authentication endpoints under `/api/users`.
///
/// A successful `login` stores the issued token in the transport's
/// credential provider, so every other client sharing that provider is
/// authorized from then on.
#[derive(Clone)]
pub struct AuthClient {
    transport: HttpTransport,
}

impl AuthClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ConciergeError::validation(
                "Username and password are required",
            ));
        }

        let request = self
            .transport
            .request(Method::POST, "/api/users/login")
            .json(&LoginRequest { username, password });
        let token: TokenBody = self.transport.json(request, None).await?;

        let mut credentials = Credentials::bearer(token.access_token).with_username(username.trim());
        if let Some(token_type) = token.token_type {
            credentials.token_type = token_type;
        }
        self.transport.credentials().store(credentials.clone())?;

        tracing::info!("[Auth] Logged in as {}", username.trim());
        Ok(credentials)
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserProfile> {
        let request = self
            .transport
            .request(Method::POST, "/api/users/register")
            .json(&RegisterRequest {
                username,
                email,
                password,
            });
        let user: UserBody = self.transport.json(request, None).await?;
        tracing::info!("[Auth] Registered account {}", user.username);
        Ok(user.into())
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        if self.transport.credentials().bearer_token().is_none() {
            return Err(ConciergeError::Unauthorized);
        }
        let request = self.transport.request(Method::GET, "/api/users/me");
        let user: UserBody = self.transport.json(request, None).await?;
        Ok(user.into())
    }

    pub fn logout(&self) -> Result<()> {
        self.transport.credentials().clear()?;
        tracing::info!("[Auth] Logged out");
        Ok(())
    }
}
