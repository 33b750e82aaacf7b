//! Request and response bodies of the recommendation service.
//!
//! The service serializes timestamps without an offset and occasionally
//! returns `null` for list fields, so responses land in these loose shapes
//! first and are converted into core types afterwards.

use chrono::{DateTime, NaiveDateTime, Utc};
use concierge_core::auth::{UserProfile, UserRole};
use concierge_core::backend::MessageReply;
use concierge_core::ledger::{BackendId, HistoryRecord};
use concierge_core::venue::{VenueDetail, VenueId, VenueLocation, VenueReview, VenueSummary};
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerRatingRequest<'a> {
    pub chat_id: i64,
    pub rating: u8,
    pub feedback: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VenueRatingRequest<'a> {
    pub venue_id: i64,
    pub rating: u8,
    pub review: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseBody {
    pub response: String,
    pub session_id: String,
    #[serde(default)]
    pub venues: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub is_safe: Option<bool>,
    #[serde(default)]
    pub chat_id: Option<i64>,
}

impl From<ChatResponseBody> for MessageReply {
    fn from(body: ChatResponseBody) -> Self {
        Self {
            assistant_text: body.response,
            session_id: body.session_id,
            backend_id: body.chat_id.map(BackendId),
            venues: venues_from_wire(body.venues.unwrap_or_default()),
            is_safe: body.is_safe.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Text(String),
}

impl WireId {
    fn as_i64(&self) -> Option<i64> {
        match self {
            WireId::Int(id) => Some(*id),
            WireId::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireVenue {
    id: WireId,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

/// Converts reply venues, dropping entries without a usable id or name.
fn venues_from_wire(raw: Vec<serde_json::Value>) -> Vec<VenueSummary> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<WireVenue>(value) {
            Ok(venue) => {
                let id = venue.id.as_i64()?;
                Some(VenueSummary::new(
                    id,
                    venue.name,
                    venue.category.as_deref(),
                    venue.score.unwrap_or(0.0),
                ))
            }
            Err(e) => {
                tracing::debug!("[Api] Skipping malformed venue in reply: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryItemBody {
    pub id: i64,
    pub message: String,
    pub response: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl From<HistoryItemBody> for HistoryRecord {
    fn from(body: HistoryItemBody) -> Self {
        Self {
            backend_id: BackendId(body.id),
            user_text: body.message,
            assistant_text: body.response,
            created_at: body
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            session_id: body.session_id,
            venues: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VenueBody {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<serde_json::Value>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub is_verified: Option<bool>,
}

impl From<VenueBody> for VenueDetail {
    fn from(body: VenueBody) -> Self {
        let location = body.location.map(|value| VenueLocation {
            address: string_field(&value, "address"),
            city: string_field(&value, "city"),
        });
        Self {
            id: VenueId(body.id),
            name: body.name,
            category: body.category,
            description: body.description,
            location,
            price_range: body.price_range,
            amenities: body.amenities.unwrap_or_default(),
            rating: body.rating.unwrap_or(0.0),
            review_count: body.review_count.unwrap_or(0),
            is_verified: body.is_verified.unwrap_or(false),
        }
    }
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewBody {
    pub id: i64,
    pub rating: f64,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<ReviewBody> for VenueReview {
    fn from(body: ReviewBody) -> Self {
        Self {
            id: body.id,
            rating: body.rating,
            review: body.review.filter(|r| !r.trim().is_empty()),
            username: body.username,
            created_at: body.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserBody {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<UserBody> for UserProfile {
    fn from(body: UserBody) -> Self {
        Self {
            id: body.id,
            username: body.username,
            email: body.email,
            role: body.role,
            is_active: body.is_active,
            created_at: body.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Parses RFC 3339 timestamps, treating offset-less ones as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
