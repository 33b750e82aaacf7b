//! Recommendation surfacer.
//!
//! Holds the venue suggestions tied to the most recent completed reply.
//! Replaced wholesale on every reply that carries venues, cleared whenever a
//! new message is sent; never merged with a previous set.

use crate::venue::{VenueId, VenueSummary};

#[derive(Debug, Clone, Default)]
pub struct RecommendationSurfacer {
    venues: Vec<VenueSummary>,
}

impl RecommendationSurfacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, venues: Vec<VenueSummary>) {
        tracing::debug!("[Recommendations] Surfacing {} venue(s)", venues.len());
        self.venues = venues;
    }

    pub fn clear(&mut self) {
        self.venues.clear();
    }

    pub fn current(&self) -> &[VenueSummary] {
        &self.venues
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Looks up a surfaced venue, e.g. before opening its detail view.
    pub fn find(&self, id: VenueId) -> Option<&VenueSummary> {
        self.venues.iter().find(|v| v.id == id)
    }
}
