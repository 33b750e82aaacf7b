//! Administrative endpoints under `/api/admin`.
//!
//! Every call requires an admin account; the service answers 403 otherwise,
//! which surfaces as a `Transport` error carrying the service's message.

use crate::transport::{HttpTransport, Lookup};
use crate::wire::{UserBody, parse_timestamp};
use chrono::{DateTime, Utc};
use concierge_core::auth::{UserProfile, UserRole};
use concierge_core::error::{ConciergeError, Result};
use concierge_core::venue::VenueId;
use reqwest::Method;
use serde::{Deserialize, Serialize};

const DEFAULT_PARSE_MAX_ITEMS: u32 = 100;
const DEFAULT_USER_LIMIT: u32 = 100;

/// Venue import job parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserConfig {
    pub city: String,
    pub category: String,
    pub max_items: u32,
}

impl ParserConfig {
    pub fn new(city: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            category: category.into(),
            max_items: DEFAULT_PARSE_MAX_ITEMS,
        }
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = max_items;
        self
    }
}

/// Filters for the user listing. Unset filters are not sent.
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub limit: u32,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            role: None,
            is_active: None,
            limit: DEFAULT_USER_LIMIT,
        }
    }
}

/// A venue review waiting for moderation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRating {
    pub id: i64,
    pub venue_id: VenueId,
    pub user_id: Option<i64>,
    pub rating: f64,
    pub review: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PendingRatingBody {
    id: i64,
    venue_id: i64,
    #[serde(default)]
    user_id: Option<i64>,
    rating: f64,
    #[serde(default)]
    review: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<PendingRatingBody> for PendingRating {
    fn from(body: PendingRatingBody) -> Self {
        Self {
            id: body.id,
            venue_id: VenueId(body.venue_id),
            user_id: body.user_id,
            rating: body.rating,
            review: body.review,
            created_at: body.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// System-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_venues: u64,
    #[serde(default)]
    pub total_chats: u64,
    #[serde(default)]
    pub total_ratings: u64,
    #[serde(default)]
    pub active_users_24h: u64,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct AdminClient {
    transport: HttpTransport,
}

impl AdminClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Starts a background venue import. Returns the service's acknowledgement.
    pub async fn trigger_venue_parse(&self, config: &ParserConfig) -> Result<String> {
        if config.city.trim().is_empty() || config.category.trim().is_empty() {
            return Err(ConciergeError::validation("City and category are required"));
        }
        let request = self
            .transport
            .request(Method::POST, "/api/admin/parse-venues")
            .json(config);
        let body: MessageBody = self.transport.json(request, None).await?;
        tracing::info!(
            "[Admin] Venue import started for {} / {}",
            config.city,
            config.category
        );
        Ok(body.message)
    }

    pub async fn unmoderated_ratings(&self, limit: u32) -> Result<Vec<PendingRating>> {
        let request = self
            .transport
            .request(Method::GET, "/api/admin/unmoderated-ratings")
            .query(&[("limit", limit)]);
        let ratings: Vec<PendingRatingBody> = self.transport.json(request, None).await?;
        Ok(ratings.into_iter().map(PendingRating::from).collect())
    }

    /// Approves (publishes) or rejects (deletes) a pending review.
    pub async fn moderate_rating(&self, rating_id: i64, approve: bool) -> Result<String> {
        let request = self
            .transport
            .request(
                Method::POST,
                &format!("/api/admin/moderate-rating/{rating_id}"),
            )
            .query(&[("approve", approve)]);
        let body: MessageBody = self
            .transport
            .json(request, Some(Lookup::new("rating", rating_id)))
            .await?;
        Ok(body.message)
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserProfile>> {
        let mut request = self
            .transport
            .request(Method::GET, "/api/admin/users")
            .query(&[("limit", query.limit)]);
        if let Some(role) = query.role {
            let role = match role {
                UserRole::User => "user",
                UserRole::Admin => "admin",
            };
            request = request.query(&[("role", role)]);
        }
        if let Some(is_active) = query.is_active {
            request = request.query(&[("is_active", is_active)]);
        }

        let users: Vec<UserBody> = self.transport.json(request, None).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Flips a user's active flag.
    pub async fn toggle_user_active(&self, user_id: i64) -> Result<String> {
        let request = self.transport.request(
            Method::POST,
            &format!("/api/admin/users/{user_id}/toggle-active"),
        );
        let body: MessageBody = self
            .transport
            .json(request, Some(Lookup::new("user", user_id)))
            .await?;
        Ok(body.message)
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        let request = self.transport.request(Method::GET, "/api/admin/stats");
        self.transport.json(request, None).await
    }
}
