use crate::backend::{HistorySource, MessageBackend};
use crate::config::ChatConfig;
use crate::error::{ConciergeError, Result};
use crate::ledger::{BackendId, Exchange, ExchangeIndex, MessageLedger};
use crate::recommendation::RecommendationSurfacer;
use crate::session::SessionIdentity;
use crate::venue::{VenueId, VenueSummary};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Assistant text substituted when a send fails.
pub const FALLBACK_REPLY: &str = "Something went wrong. Please try again.";

/// Result of a `send` that got past validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The backend replied and the exchange was completed.
    Completed {
        index: ExchangeIndex,
        backend_id: Option<BackendId>,
        venue_count: usize,
        session_rotated: bool,
    },
    /// The round-trip failed; the exchange carries `FALLBACK_REPLY`.
    Failed {
        index: ExchangeIndex,
        error: ConciergeError,
    },
}

impl SendOutcome {
    pub fn index(&self) -> ExchangeIndex {
        match self {
            SendOutcome::Completed { index, .. } | SendOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed { .. })
    }
}

/// What the rendering layer needs to draw the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub session_id: String,
    /// Ordered oldest first.
    pub exchanges: Vec<Exchange>,
    pub pending: bool,
    pub venues: Vec<VenueSummary>,
}

#[derive(Debug)]
struct ConversationState {
    identity: SessionIdentity,
    ledger: MessageLedger,
    surfacer: RecommendationSurfacer,
}

impl ConversationState {
    fn fresh(welcome_message: &str) -> Result<Self> {
        let identity = SessionIdentity::generate();
        let mut ledger = MessageLedger::new();
        ledger.append_welcome(welcome_message, identity.current_session_id())?;
        Ok(Self {
            identity,
            ledger,
            surfacer: RecommendationSurfacer::new(),
        })
    }
}

/// Orchestrates sending messages and reconciling replies.
///
/// All state lives behind one lock that is never held across the network
/// call. `send` is serialized: a second call while one is outstanding is
/// rejected with `Busy`. There is no cancellation; a `send` future must be
/// driven to completion or its exchange stays pending.
pub struct ConversationController {
    state: RwLock<ConversationState>,
    backend: Arc<dyn MessageBackend>,
    welcome_message: String,
}

impl ConversationController {
    /// Builds a controller for a brand-new session with a welcome exchange.
    pub fn new_session(backend: Arc<dyn MessageBackend>, chat: &ChatConfig) -> Result<Self> {
        let state = ConversationState::fresh(&chat.welcome_message)?;
        tracing::info!(
            "[Conversation] Started new session {}",
            state.identity.current_session_id()
        );
        Ok(Self {
            state: RwLock::new(state),
            backend,
            welcome_message: chat.welcome_message.clone(),
        })
    }

    /// Builds a controller from persisted history.
    ///
    /// Hydration completes before the controller exists, so no `send` can
    /// be interleaved with it. Empty history starts a new session.
    ///
    /// # Errors
    ///
    /// Returns the history source's error; callers typically fall back to
    /// `new_session`.
    pub async fn initialize(
        history: &dyn HistorySource,
        backend: Arc<dyn MessageBackend>,
        session_hint: Option<&str>,
        chat: &ChatConfig,
    ) -> Result<Self> {
        let records = history.fetch_history(session_hint).await?;
        if records.is_empty() {
            return Self::new_session(backend, chat);
        }

        let identity = SessionIdentity::from_history(&records, session_hint);
        let mut ledger = MessageLedger::new();
        let count = ledger.hydrate(records, identity.current_session_id())?;
        tracing::info!(
            "[Conversation] Restored {} exchange(s) for session {}",
            count,
            identity.current_session_id()
        );

        Ok(Self {
            state: RwLock::new(ConversationState {
                identity,
                ledger,
                surfacer: RecommendationSurfacer::new(),
            }),
            backend,
            welcome_message: chat.welcome_message.clone(),
        })
    }

    /// Sends a user message and reconciles the reply.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank text (ledger unchanged)
    /// - `Busy` while a previous send is outstanding
    /// - `InvalidState` if the ledger rejects the reconciliation (caller bug)
    ///
    /// Transport failures are not errors: they yield `SendOutcome::Failed`.
    pub async fn send(&self, user_text: &str) -> Result<SendOutcome> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(ConciergeError::validation("message text is blank"));
        }

        let (handle, session_id) = {
            let mut state = self.state.write().await;
            if state.ledger.is_pending() {
                tracing::debug!("[Conversation] Rejecting send while a reply is pending");
                return Err(ConciergeError::Busy);
            }
            let session_id = state.identity.current_session_id().to_string();
            let handle = state.ledger.append(text, session_id.clone())?;
            // Stale suggestions must not linger during the round-trip.
            state.surfacer.clear();
            (handle, session_id)
        };

        tracing::debug!(
            "[Conversation] Sending exchange {} in session {}",
            handle.index(),
            session_id
        );
        let result = self.backend.post_message(text, &session_id).await;

        let mut state = self.state.write().await;
        match result {
            Ok(reply) => {
                let reply_session = if reply.session_id.trim().is_empty() {
                    session_id
                } else {
                    reply.session_id
                };
                let venue_count = reply.venues.len();
                if !reply.is_safe {
                    tracing::info!(
                        "[Conversation] Exchange {} was refused by moderation",
                        handle.index()
                    );
                }

                state.ledger.complete(
                    handle,
                    reply.assistant_text,
                    reply.backend_id,
                    reply_session.clone(),
                    reply.venues.clone(),
                )?;
                let session_rotated = state.identity.adopt(&reply_session);
                if venue_count > 0 {
                    state.surfacer.replace(reply.venues);
                }

                Ok(SendOutcome::Completed {
                    index: handle.index(),
                    backend_id: reply.backend_id,
                    venue_count,
                    session_rotated,
                })
            }
            Err(error) => {
                tracing::warn!(
                    "[Conversation] Exchange {} failed: {}",
                    handle.index(),
                    error
                );
                state.ledger.fail(handle, FALLBACK_REPLY)?;
                Ok(SendOutcome::Failed {
                    index: handle.index(),
                    error,
                })
            }
        }
    }

    /// Explicitly starts a new session: fresh identity, fresh ledger with a
    /// welcome exchange, no surfaced venues.
    pub async fn start_new_session(&self) -> Result<String> {
        let mut state = self.state.write().await;
        if state.ledger.is_pending() {
            return Err(ConciergeError::Busy);
        }
        *state = ConversationState::fresh(&self.welcome_message)?;
        let session_id = state.identity.current_session_id().to_string();
        tracing::info!("[Conversation] Started new session {}", session_id);
        Ok(session_id)
    }

    /// Read-only snapshot for the rendering layer.
    pub async fn view(&self) -> ConversationView {
        let state = self.state.read().await;
        ConversationView {
            session_id: state.identity.current_session_id().to_string(),
            exchanges: state.ledger.snapshot(),
            pending: state.ledger.is_pending(),
            venues: state.surfacer.current().to_vec(),
        }
    }

    pub async fn snapshot(&self) -> Vec<Exchange> {
        self.state.read().await.ledger.snapshot()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.ledger.is_pending()
    }

    pub async fn session_id(&self) -> String {
        self.state
            .read()
            .await
            .identity
            .current_session_id()
            .to_string()
    }

    pub async fn recommendations(&self) -> Vec<VenueSummary> {
        self.state.read().await.surfacer.current().to_vec()
    }

    pub async fn surfaced_venue(&self, venue_id: VenueId) -> Option<VenueSummary> {
        self.state.read().await.surfacer.find(venue_id).cloned()
    }

    pub async fn exchange_by_backend_id(&self, backend_id: BackendId) -> Option<Exchange> {
        self.state
            .read()
            .await
            .ledger
            .find_by_backend_id(backend_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MessageReply;
    use crate::ledger::HistoryRecord;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Replies from a script; optionally holds each call until a permit is released.
    struct MockMessageBackend {
        replies: Mutex<VecDeque<Result<MessageReply>>>,
        gate: Option<Arc<Semaphore>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockMessageBackend {
        fn scripted(replies: Vec<Result<MessageReply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                gate: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn gated(replies: Vec<Result<MessageReply>>, gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::scripted(replies)
            }
        }
    }

    #[async_trait]
    impl MessageBackend for MockMessageBackend {
        async fn post_message(&self, user_text: &str, session_id: &str) -> Result<MessageReply> {
            self.calls
                .lock()
                .unwrap()
                .push((user_text.to_string(), session_id.to_string()));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ConciergeError::transport(None, "no scripted reply")))
        }
    }

    struct MockHistorySource {
        records: Result<Vec<HistoryRecord>>,
    }

    #[async_trait]
    impl HistorySource for MockHistorySource {
        async fn fetch_history(&self, _session_hint: Option<&str>) -> Result<Vec<HistoryRecord>> {
            self.records.clone()
        }
    }

    fn reply(text: &str, session_id: &str, backend_id: i64, venues: Vec<VenueSummary>) -> MessageReply {
        MessageReply {
            assistant_text: text.to_string(),
            session_id: session_id.to_string(),
            backend_id: Some(BackendId(backend_id)),
            venues,
            is_safe: true,
        }
    }

    fn history_record(id: i64, session_id: &str) -> HistoryRecord {
        HistoryRecord {
            backend_id: BackendId(id),
            user_text: format!("question {id}"),
            assistant_text: format!("answer {id}"),
            created_at: Utc::now(),
            session_id: Some(session_id.to_string()),
            venues: Vec::new(),
        }
    }

    async fn empty_history_controller(backend: MockMessageBackend) -> ConversationController {
        let history = MockHistorySource {
            records: Ok(Vec::new()),
        };
        ConversationController::initialize(&history, Arc::new(backend), None, &ChatConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sushi_scenario() {
        let backend = MockMessageBackend::scripted(vec![Ok(reply(
            "Try Sushi Bar",
            "s1",
            42,
            vec![VenueSummary::new(7, "Sushi Bar", Some("restaurant"), 0.9)],
        ))]);
        let controller = empty_history_controller(backend).await;

        let outcome = controller.send("sushi near me").await.unwrap();
        assert!(outcome.is_completed());

        let view = controller.view().await;
        assert_eq!(view.exchanges.len(), 2);
        assert!(view.exchanges[0].is_welcome());
        assert_eq!(view.exchanges[1].user_text, "sushi near me");
        assert_eq!(view.exchanges[1].assistant_text(), Some("Try Sushi Bar"));
        assert_eq!(view.exchanges[1].backend_id(), Some(BackendId(42)));
        assert_eq!(view.session_id, "s1");
        assert!(!view.pending);

        assert_eq!(view.venues.len(), 1);
        assert_eq!(view.venues[0].name, "Sushi Bar");
        assert_eq!(view.venues[0].relevance_percent(), 90);
    }

    #[tokio::test]
    async fn test_blank_send_is_rejected_without_side_effects() {
        let backend = Arc::new(MockMessageBackend::scripted(Vec::new()));
        let controller =
            ConversationController::new_session(backend.clone(), &ChatConfig::default()).unwrap();

        let err = controller.send("").await.unwrap_err();
        assert!(err.is_validation());
        let err = controller.send("   ").await.unwrap_err();
        assert!(err.is_validation());

        assert_eq!(controller.snapshot().await.len(), 1);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_send_while_pending_is_busy() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(MockMessageBackend::gated(
            vec![Ok(reply("first answer", "s1", 1, Vec::new()))],
            gate.clone(),
        ));
        let controller = Arc::new(
            ConversationController::new_session(backend.clone(), &ChatConfig::default()).unwrap(),
        );

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.send("first").await })
        };
        while !controller.is_pending().await {
            tokio::task::yield_now().await;
        }

        let err = controller.send("second").await.unwrap_err();
        assert!(err.is_busy());
        assert!(controller.start_new_session().await.unwrap_err().is_busy());

        // The pending exchange is unaffected.
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[1].is_pending());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);

        gate.add_permits(1);
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.is_completed());
        assert!(!controller.is_pending().await);
    }

    #[tokio::test]
    async fn test_surfacer_cleared_while_reply_pending() {
        let gate = Arc::new(Semaphore::new(1));
        let backend = Arc::new(MockMessageBackend::gated(
            vec![
                Ok(reply("one", "s1", 1, vec![VenueSummary::new(1, "A", None, 0.3)])),
                Ok(reply("two", "s1", 2, Vec::new())),
            ],
            gate.clone(),
        ));
        let controller = Arc::new(
            ConversationController::new_session(backend, &ChatConfig::default()).unwrap(),
        );

        controller.send("first").await.unwrap();
        assert_eq!(controller.recommendations().await.len(), 1);

        let second = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.send("second").await })
        };
        while !controller.is_pending().await {
            tokio::task::yield_now().await;
        }
        assert!(controller.recommendations().await.is_empty());

        gate.add_permits(1);
        second.await.unwrap().unwrap();
        // A reply without venues leaves the surfacer empty.
        assert!(controller.recommendations().await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_uses_fallback_and_keeps_session() {
        let backend = MockMessageBackend::scripted(vec![
            Ok(reply("hello", "s1", 1, vec![VenueSummary::new(3, "Cafe", None, 0.5)])),
            Err(ConciergeError::transport(Some(503), "unavailable")),
        ]);
        let controller = empty_history_controller(backend).await;

        controller.send("hi").await.unwrap();
        let session_before = controller.session_id().await;

        let outcome = controller.send("anything nearby?").await.unwrap();
        match &outcome {
            SendOutcome::Failed { error, .. } => assert!(error.is_transport()),
            other => panic!("expected failure, got {other:?}"),
        }

        let view = controller.view().await;
        let failed = view.exchanges.last().unwrap();
        assert!(failed.is_failed());
        assert_eq!(failed.assistant_text(), Some(FALLBACK_REPLY));
        assert_eq!(failed.session_id, session_before);
        assert_eq!(view.session_id, session_before);
        assert!(view.venues.is_empty());
        assert!(!view.pending);
    }

    #[tokio::test]
    async fn test_session_rotation_is_adopted_for_later_exchanges() {
        let backend = Arc::new(MockMessageBackend::scripted(vec![
            Ok(reply("a", "s1", 1, Vec::new())),
            Ok(reply("b", "s2", 2, Vec::new())),
            Ok(reply("c", "s2", 3, Vec::new())),
        ]));
        let controller =
            ConversationController::new_session(backend.clone(), &ChatConfig::default()).unwrap();
        let initial = controller.session_id().await;

        controller.send("one").await.unwrap();
        let outcome = controller.send("two").await.unwrap();
        assert!(matches!(
            outcome,
            SendOutcome::Completed {
                session_rotated: true,
                ..
            }
        ));
        controller.send("three").await.unwrap();

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls[0].1, initial);
        assert_eq!(calls[1].1, "s1");
        assert_eq!(calls[2].1, "s2");

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot[0].session_id, initial);
        assert_eq!(snapshot[1].session_id, "s1");
        assert_eq!(snapshot[2].session_id, "s2");
    }

    #[tokio::test]
    async fn test_ledger_length_and_ordering_properties() {
        let sends = 4;
        let replies = (0..sends)
            .map(|i| Ok(reply(&format!("answer {i}"), "s", i, Vec::new())))
            .collect();
        let history = MockHistorySource {
            records: Ok(vec![history_record(100, "old"), history_record(101, "old")]),
        };
        let controller = ConversationController::initialize(
            &history,
            Arc::new(MockMessageBackend::scripted(replies)),
            None,
            &ChatConfig::default(),
        )
        .await
        .unwrap();

        // History present: no welcome exchange, identity adopted from history.
        assert_eq!(controller.session_id().await, "old");

        for i in 0..sends {
            controller.send(&format!("question {i}")).await.unwrap();
            let snapshot = controller.snapshot().await;
            assert_eq!(snapshot.len(), 2 + i as usize + 1);
            assert!(snapshot.windows(2).all(|w| w[0].index < w[1].index));
            assert!(snapshot.iter().filter(|e| e.is_pending()).count() <= 1);
        }

        let found = controller.exchange_by_backend_id(BackendId(101)).await.unwrap();
        assert_eq!(found.user_text, "question 101");
    }

    #[tokio::test]
    async fn test_initialize_propagates_history_failure() {
        let history = MockHistorySource {
            records: Err(ConciergeError::transport(None, "offline")),
        };
        let result = ConversationController::initialize(
            &history,
            Arc::new(MockMessageBackend::scripted(Vec::new())),
            None,
            &ChatConfig::default(),
        )
        .await;
        assert!(result.err().unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_start_new_session_resets_conversation() {
        let backend = MockMessageBackend::scripted(vec![Ok(reply(
            "here",
            "s1",
            5,
            vec![VenueSummary::new(9, "Bar", None, 0.7)],
        ))]);
        let controller = empty_history_controller(backend).await;
        controller.send("drinks").await.unwrap();

        let new_id = controller.start_new_session().await.unwrap();
        let view = controller.view().await;
        assert_ne!(new_id, "s1");
        assert_eq!(view.session_id, new_id);
        assert_eq!(view.exchanges.len(), 1);
        assert!(view.exchanges[0].is_welcome());
        assert!(view.venues.is_empty());
    }
}
