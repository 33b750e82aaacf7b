//! Venue domain models.
//!
//! `VenueSummary` is the light projection attached to an assistant reply;
//! `VenueDetail` is what the venue detail source returns when the user
//! selects one of the surfaced venues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend identifier of a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(pub i64);

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A venue suggestion as surfaced after a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSummary {
    pub id: VenueId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Relevance score in `[0, 1]`.
    #[serde(default)]
    pub score: f64,
}

impl VenueSummary {
    pub fn new(id: i64, name: impl Into<String>, category: Option<&str>, score: f64) -> Self {
        Self {
            id: VenueId(id),
            name: name.into(),
            category: category.map(str::to_string),
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Relevance as a whole percentage (0.9 -> 90).
    pub fn relevance_percent(&self) -> u8 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Street location of a venue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VenueLocation {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Full venue record returned by the venue detail source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDetail {
    pub id: VenueId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<VenueLocation>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Average user rating, 0 when nobody rated yet.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub is_verified: bool,
}

impl VenueDetail {
    pub fn has_rating(&self) -> bool {
        self.rating > 0.0
    }
}

/// A published user review of a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueReview {
    pub id: i64,
    pub rating: f64,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
