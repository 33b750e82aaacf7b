use crate::backend::RatingBackend;
use crate::error::{ConciergeError, Result};
use crate::ledger::{BackendId, Exchange};
use crate::venue::VenueId;
use std::fmt;

/// Highest score on the rating scale.
pub const MAX_SCORE: u8 = 5;

/// What is being rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingTarget {
    /// An assistant answer, identified by its backend id.
    Answer(BackendId),
    /// A venue from the detail view.
    Venue(VenueId),
}

impl fmt::Display for RatingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingTarget::Answer(id) => write!(f, "answer #{id}"),
            RatingTarget::Venue(id) => write!(f, "venue #{id}"),
        }
    }
}

/// Draft collected while the user is rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingDraft {
    pub target: RatingTarget,
    /// 0 means unset.
    pub score: u8,
    /// Feedback for answers, review text for venues.
    pub feedback: String,
}

impl RatingDraft {
    fn new(target: RatingTarget) -> Self {
        Self {
            target,
            score: 0,
            feedback: String::new(),
        }
    }

    pub fn is_submittable(&self) -> bool {
        (1..=MAX_SCORE).contains(&self.score)
    }
}

/// `Idle -> Collecting -> Submitting -> Idle` on success,
/// `Submitting -> Collecting` on failure, `Collecting -> Idle` on cancel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RatingState {
    #[default]
    Idle,
    Collecting(RatingDraft),
    Submitting(RatingDraft),
}

impl RatingState {
    pub fn name(&self) -> &'static str {
        match self {
            RatingState::Idle => "idle",
            RatingState::Collecting(_) => "collecting",
            RatingState::Submitting(_) => "submitting",
        }
    }
}

/// The single active rating flow.
///
/// Opening a flow for another target discards any unfinished draft.
/// Drafts are destroyed on successful submit or cancel, and never retried
/// automatically: a failed submit returns to `Collecting` with the draft intact.
#[derive(Debug, Clone, Default)]
pub struct RatingWorkflow {
    state: RatingState,
}

impl RatingWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RatingState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, RatingState::Idle)
    }

    /// The draft being edited or submitted, if any.
    pub fn draft(&self) -> Option<&RatingDraft> {
        match &self.state {
            RatingState::Idle => None,
            RatingState::Collecting(draft) | RatingState::Submitting(draft) => Some(draft),
        }
    }

    /// Starts collecting a rating for `target`.
    ///
    /// Returns the discarded draft when another flow was still collecting.
    pub fn open(&mut self, target: RatingTarget) -> Result<Option<RatingDraft>> {
        let discarded = match std::mem::take(&mut self.state) {
            RatingState::Idle => None,
            RatingState::Collecting(draft) if draft.target == target => {
                // Re-opening the same target keeps the draft.
                self.state = RatingState::Collecting(draft);
                return Ok(None);
            }
            RatingState::Collecting(draft) => {
                tracing::debug!("[Rating] Discarding unfinished draft for {}", draft.target);
                Some(draft)
            }
            RatingState::Submitting(draft) => {
                self.state = RatingState::Submitting(draft);
                return Err(ConciergeError::invalid_state(
                    "a rating is being submitted",
                ));
            }
        };

        self.state = RatingState::Collecting(RatingDraft::new(target));
        Ok(discarded)
    }

    /// Opens a flow for an assistant answer.
    ///
    /// Only exchanges with a backend id are rateable; the synthetic welcome
    /// exchange and provisional or failed exchanges are not.
    pub fn open_for_exchange(&mut self, exchange: &Exchange) -> Result<Option<RatingDraft>> {
        let backend_id = exchange.backend_id().ok_or_else(|| {
            ConciergeError::validation(format!(
                "exchange {} has no backend id and cannot be rated",
                exchange.index
            ))
        })?;
        self.open(RatingTarget::Answer(backend_id))
    }

    pub fn set_score(&mut self, score: u8) -> Result<()> {
        if score > MAX_SCORE {
            return Err(ConciergeError::validation(format!(
                "score must be between 1 and {MAX_SCORE}"
            )));
        }
        self.collecting_mut()?.score = score;
        Ok(())
    }

    pub fn set_feedback(&mut self, feedback: impl Into<String>) -> Result<()> {
        self.collecting_mut()?.feedback = feedback.into();
        Ok(())
    }

    /// Abandons the draft. A no-op when idle.
    pub fn cancel(&mut self) -> Result<Option<RatingDraft>> {
        match std::mem::take(&mut self.state) {
            RatingState::Idle => Ok(None),
            RatingState::Collecting(draft) => Ok(Some(draft)),
            RatingState::Submitting(draft) => {
                self.state = RatingState::Submitting(draft);
                Err(ConciergeError::invalid_state(
                    "cannot cancel a rating that is being submitted",
                ))
            }
        }
    }

    /// `Collecting -> Submitting`, permitted only once a score is set.
    ///
    /// Returns the draft to send.
    pub fn begin_submit(&mut self) -> Result<RatingDraft> {
        let draft = match &self.state {
            RatingState::Collecting(draft) => draft.clone(),
            other => {
                return Err(ConciergeError::invalid_state(format!(
                    "cannot submit a rating while {}",
                    other.name()
                )));
            }
        };
        if !draft.is_submittable() {
            return Err(ConciergeError::validation("choose a score from 1 to 5"));
        }

        self.state = RatingState::Submitting(draft.clone());
        Ok(draft)
    }

    /// Applies the backend outcome of a submission.
    ///
    /// Success destroys the draft; failure returns to `Collecting` so the user
    /// can retry, and the error is handed back.
    pub fn finish_submit(&mut self, outcome: Result<()>) -> Result<()> {
        let draft = match std::mem::take(&mut self.state) {
            RatingState::Submitting(draft) => draft,
            other => {
                let name = other.name();
                self.state = other;
                return Err(ConciergeError::invalid_state(format!(
                    "no rating submission in flight (state: {name})"
                )));
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!("[Rating] Submitted {} ({} stars)", draft.target, draft.score);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("[Rating] Submitting {} failed: {}", draft.target, err);
                self.state = RatingState::Collecting(draft);
                Err(err)
            }
        }
    }

    /// Submits the current draft through `backend`.
    pub async fn submit(&mut self, backend: &dyn RatingBackend) -> Result<()> {
        let draft = self.begin_submit()?;
        let outcome = match draft.target {
            RatingTarget::Answer(backend_id) => {
                backend
                    .post_answer_rating(backend_id, draft.score, &draft.feedback)
                    .await
            }
            RatingTarget::Venue(venue_id) => {
                backend
                    .post_venue_rating(venue_id, draft.score, &draft.feedback)
                    .await
            }
        };
        self.finish_submit(outcome)
    }

    fn collecting_mut(&mut self) -> Result<&mut RatingDraft> {
        match &mut self.state {
            RatingState::Collecting(draft) => Ok(draft),
            other => Err(ConciergeError::invalid_state(format!(
                "no rating is being collected (state: {})",
                other.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MessageLedger;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records submissions; fails while `fail` is set.
    #[derive(Default)]
    struct MockRatingBackend {
        fail: Mutex<bool>,
        answers: Mutex<Vec<(BackendId, u8, String)>>,
        venues: Mutex<Vec<(VenueId, u8, String)>>,
    }

    #[async_trait]
    impl RatingBackend for MockRatingBackend {
        async fn post_answer_rating(
            &self,
            backend_id: BackendId,
            score: u8,
            feedback: &str,
        ) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(ConciergeError::transport(Some(500), "boom"));
            }
            self.answers
                .lock()
                .unwrap()
                .push((backend_id, score, feedback.to_string()));
            Ok(())
        }

        async fn post_venue_rating(&self, venue_id: VenueId, score: u8, review: &str) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(ConciergeError::transport(None, "offline"));
            }
            self.venues
                .lock()
                .unwrap()
                .push((venue_id, score, review.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_submit_rejected_while_score_unset() {
        let backend = MockRatingBackend::default();
        let mut workflow = RatingWorkflow::new();
        workflow.open(RatingTarget::Answer(BackendId(42))).unwrap();

        let err = workflow.submit(&backend).await.unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(workflow.state(), RatingState::Collecting(_)));
        assert!(backend.answers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_score_from_one_to_five_is_accepted() {
        let backend = MockRatingBackend::default();
        let mut workflow = RatingWorkflow::new();

        for score in 1..=MAX_SCORE {
            workflow.open(RatingTarget::Answer(BackendId(1))).unwrap();
            workflow.set_score(score).unwrap();
            workflow.submit(&backend).await.unwrap();
            assert!(workflow.is_idle());
        }
        assert_eq!(backend.answers.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_score_above_five_is_rejected() {
        let mut workflow = RatingWorkflow::new();
        workflow.open(RatingTarget::Venue(VenueId(7))).unwrap();
        assert!(workflow.set_score(6).unwrap_err().is_validation());
        assert_eq!(workflow.draft().unwrap().score, 0);
    }

    #[tokio::test]
    async fn test_failure_returns_to_collecting_with_draft() {
        let backend = MockRatingBackend::default();
        *backend.fail.lock().unwrap() = true;

        let mut workflow = RatingWorkflow::new();
        workflow.open(RatingTarget::Venue(VenueId(7))).unwrap();
        workflow.set_score(4).unwrap();
        workflow.set_feedback("great tea").unwrap();

        let err = workflow.submit(&backend).await.unwrap_err();
        assert!(err.is_transport());
        let draft = workflow.draft().unwrap();
        assert!(matches!(workflow.state(), RatingState::Collecting(_)));
        assert_eq!(draft.score, 4);
        assert_eq!(draft.feedback, "great tea");

        // User retries manually.
        *backend.fail.lock().unwrap() = false;
        workflow.submit(&backend).await.unwrap();
        assert!(workflow.is_idle());
        assert_eq!(
            backend.venues.lock().unwrap()[0],
            (VenueId(7), 4, "great tea".to_string())
        );
    }

    #[test]
    fn test_cancel_and_reopen_discards_draft() {
        let mut workflow = RatingWorkflow::new();
        workflow.open(RatingTarget::Answer(BackendId(1))).unwrap();
        workflow.set_score(3).unwrap();

        let discarded = workflow.open(RatingTarget::Answer(BackendId(2))).unwrap();
        assert_eq!(discarded.unwrap().score, 3);
        assert_eq!(workflow.draft().unwrap().score, 0);

        let cancelled = workflow.cancel().unwrap();
        assert_eq!(cancelled.unwrap().target, RatingTarget::Answer(BackendId(2)));
        assert!(workflow.is_idle());
        assert!(workflow.set_score(2).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_submitting_state_blocks_edits() {
        let mut workflow = RatingWorkflow::new();
        workflow.open(RatingTarget::Answer(BackendId(1))).unwrap();
        workflow.set_score(5).unwrap();
        workflow.begin_submit().unwrap();

        assert_eq!(workflow.state().name(), "submitting");
        assert!(workflow.cancel().unwrap_err().is_invalid_state());
        assert!(workflow
            .open(RatingTarget::Answer(BackendId(2)))
            .unwrap_err()
            .is_invalid_state());

        workflow.finish_submit(Ok(())).unwrap();
        assert!(workflow.is_idle());
        assert!(workflow.finish_submit(Ok(())).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_welcome_exchange_is_not_rateable() {
        let mut ledger = MessageLedger::new();
        ledger.append_welcome("hello", "s").unwrap();

        let mut workflow = RatingWorkflow::new();
        let err = workflow.open_for_exchange(&ledger.exchanges()[0]).unwrap_err();
        assert!(err.is_validation());
        assert!(workflow.is_idle());
    }
}
