//! Collaborator interfaces.
//!
//! These traits decouple the conversation core from the transport that talks
//! to the recommendation service (REST over HTTP in production, mocks in
//! tests). Implementations attach credentials themselves; the core assumes
//! every request is pre-authorized.

use crate::auth::Credentials;
use crate::error::Result;
use crate::ledger::{BackendId, HistoryRecord};
use crate::venue::{VenueDetail, VenueId, VenueReview, VenueSummary};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The backend's answer to a posted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReply {
    pub assistant_text: String,
    /// Possibly rotated session id; the backend is authoritative.
    pub session_id: String,
    /// Correlation id of the stored exchange, when the backend reports one.
    pub backend_id: Option<BackendId>,
    #[serde(default)]
    pub venues: Vec<VenueSummary>,
    /// False when the content moderation layer refused the message.
    #[serde(default = "default_is_safe")]
    pub is_safe: bool,
}

fn default_is_safe() -> bool {
    true
}

/// Source of persisted conversation history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetches persisted exchanges, oldest first.
    ///
    /// An empty result signals a new session.
    async fn fetch_history(&self, session_hint: Option<&str>) -> Result<Vec<HistoryRecord>>;
}

/// The conversational backend.
#[async_trait]
pub trait MessageBackend: Send + Sync {
    /// Posts a user message under the given session.
    ///
    /// # Errors
    ///
    /// Transport-class errors only; the caller recovers them locally.
    async fn post_message(&self, user_text: &str, session_id: &str) -> Result<MessageReply>;
}

/// Rating submission endpoints.
#[async_trait]
pub trait RatingBackend: Send + Sync {
    async fn post_answer_rating(
        &self,
        backend_id: BackendId,
        score: u8,
        feedback: &str,
    ) -> Result<()>;

    async fn post_venue_rating(&self, venue_id: VenueId, score: u8, review: &str) -> Result<()>;
}

/// Read-only venue lookups used when the user selects a surfaced venue.
#[async_trait]
pub trait VenueSource: Send + Sync {
    async fn fetch_venue(&self, venue_id: VenueId) -> Result<VenueDetail>;

    async fn fetch_venue_reviews(
        &self,
        venue_id: VenueId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VenueReview>>;
}

/// Supplies the bearer credential attached to backend calls.
///
/// Passed explicitly into the HTTP adapters instead of being read from
/// ambient global storage.
pub trait CredentialProvider: Send + Sync {
    /// The bearer token to attach, if the user is logged in.
    fn bearer_token(&self) -> Option<String>;

    /// The currently stored credentials.
    fn credentials(&self) -> Option<Credentials>;

    /// Stores freshly issued credentials.
    fn store(&self, credentials: Credentials) -> Result<()>;

    /// Forgets the stored credentials (logout or authorization failure).
    fn clear(&self) -> Result<()>;
}
