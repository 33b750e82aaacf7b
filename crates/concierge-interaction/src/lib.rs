//! HTTP adapters for the recommendation service.
//!
//! - `ApiClient`: chat history, messages, ratings and venue lookups
//! - `AuthClient`: login, registration, current account
//! - `AdminClient`: venue import, review moderation, user management
//!
//! All three share one `HttpTransport`, which attaches the bearer token from
//! the injected `CredentialProvider` and maps failures onto `ConciergeError`.

pub mod admin_client;
pub mod api_client;
pub mod auth_client;
pub mod transport;
mod wire;

pub use admin_client::{AdminClient, ParserConfig, PendingRating, SystemStats, UserQuery};
pub use api_client::ApiClient;
pub use auth_client::AuthClient;
pub use transport::HttpTransport;
