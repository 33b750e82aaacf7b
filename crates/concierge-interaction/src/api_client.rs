//! REST implementation of the conversation collaborators.

use crate::transport::{HttpTransport, Lookup};
use crate::wire::{
    AnswerRatingRequest, ChatResponseBody, HistoryItemBody, ReviewBody, SendMessageRequest,
    VenueBody, VenueRatingRequest,
};
use async_trait::async_trait;
use concierge_core::backend::{
    CredentialProvider, HistorySource, MessageBackend, MessageReply, RatingBackend, VenueSource,
};
use concierge_core::config::{ClientConfig, DEFAULT_HISTORY_LIMIT};
use concierge_core::error::Result;
use concierge_core::ledger::{BackendId, HistoryRecord};
use concierge_core::venue::{VenueDetail, VenueId, VenueReview};
use reqwest::Method;
use std::sync::Arc;

/// Client for the chat and venue endpoints of the recommendation service.
///
/// Implements `HistorySource`, `MessageBackend`, `RatingBackend` and
/// `VenueSource`, so one instance backs the whole conversation core.
#[derive(Clone)]
pub struct ApiClient {
    transport: HttpTransport,
    history_limit: u32,
}

impl ApiClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&config.api, credentials)?;
        Ok(Self::new(transport).with_history_limit(config.chat.history_limit))
    }

    /// Sets how many persisted exchanges `fetch_history` requests.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

#[async_trait]
impl HistorySource for ApiClient {
    async fn fetch_history(&self, session_hint: Option<&str>) -> Result<Vec<HistoryRecord>> {
        let mut request = self
            .transport
            .request(Method::GET, "/api/chat/history")
            .query(&[("limit", self.history_limit)]);
        if let Some(session_id) = session_hint {
            request = request.query(&[("session_id", session_id)]);
        }

        let items: Vec<HistoryItemBody> = self.transport.json(request, None).await?;
        tracing::debug!("[Api] Fetched {} history records", items.len());

        // The service answers newest first.
        let mut records: Vec<HistoryRecord> = items.into_iter().map(HistoryRecord::from).collect();
        records.reverse();
        Ok(records)
    }
}

#[async_trait]
impl MessageBackend for ApiClient {
    async fn post_message(&self, user_text: &str, session_id: &str) -> Result<MessageReply> {
        let request = self
            .transport
            .request(Method::POST, "/api/chat/message")
            .json(&SendMessageRequest {
                message: user_text,
                session_id,
            });

        let body: ChatResponseBody = self.transport.json(request, None).await?;
        let reply = MessageReply::from(body);
        if !reply.is_safe {
            tracing::info!("[Api] Message was refused by content moderation");
        }
        Ok(reply)
    }
}

#[async_trait]
impl RatingBackend for ApiClient {
    async fn post_answer_rating(
        &self,
        backend_id: BackendId,
        score: u8,
        feedback: &str,
    ) -> Result<()> {
        let request = self
            .transport
            .request(Method::POST, "/api/chat/rate-answer")
            .json(&AnswerRatingRequest {
                chat_id: backend_id.0,
                rating: score,
                feedback,
            });
        self.transport.send(request).await
    }

    async fn post_venue_rating(&self, venue_id: VenueId, score: u8, review: &str) -> Result<()> {
        let request = self
            .transport
            .request(Method::POST, &format!("/api/venues/{venue_id}/rate"))
            .json(&VenueRatingRequest {
                venue_id: venue_id.0,
                rating: score,
                review,
            });
        self.transport.send(request).await
    }
}

#[async_trait]
impl VenueSource for ApiClient {
    async fn fetch_venue(&self, venue_id: VenueId) -> Result<VenueDetail> {
        let request = self
            .transport
            .request(Method::GET, &format!("/api/venues/{venue_id}"));
        let body: VenueBody = self
            .transport
            .json(request, Some(Lookup::new("venue", venue_id)))
            .await?;
        Ok(body.into())
    }

    async fn fetch_venue_reviews(
        &self,
        venue_id: VenueId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VenueReview>> {
        let request = self
            .transport
            .request(Method::GET, &format!("/api/venues/{venue_id}/reviews"))
            .query(&[("limit", limit), ("offset", offset)]);
        let reviews: Vec<ReviewBody> = self
            .transport
            .json(request, Some(Lookup::new("venue", venue_id)))
            .await?;
        Ok(reviews.into_iter().map(VenueReview::from).collect())
    }
}
