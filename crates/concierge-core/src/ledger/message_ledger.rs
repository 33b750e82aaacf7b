use super::exchange::{
    BackendId, Exchange, ExchangeHandle, ExchangeIndex, HistoryRecord, Reply,
};
use crate::error::{ConciergeError, Result};
use crate::venue::VenueSummary;
use chrono::Utc;

/// Ordered, append-only sequence of exchanges.
///
/// `MessageLedger` guarantees:
/// - indices are strictly increasing and never reused
/// - entries are never removed or reordered
/// - at most one exchange is provisional (`Reply::Pending`), and it is the last one
///
/// Completing or failing requires the handle returned by `append`; doing so
/// with no provisional exchange is an `InvalidState` fault, never a no-op.
#[derive(Debug, Clone, Default)]
pub struct MessageLedger {
    exchanges: Vec<Exchange>,
    next_index: u64,
    pending: Option<ExchangeIndex>,
}

impl MessageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-appends persisted history, oldest first.
    ///
    /// Only allowed on an empty ledger, before any user-driven append.
    /// Records without a session id, or with a blank one, inherit
    /// `fallback_session_id`.
    pub fn hydrate(
        &mut self,
        records: Vec<HistoryRecord>,
        fallback_session_id: &str,
    ) -> Result<usize> {
        if !self.exchanges.is_empty() {
            return Err(self.fault("hydrate called on a non-empty ledger"));
        }

        let count = records.len();
        for record in records {
            let index = self.allocate_index();
            self.exchanges.push(Exchange {
                index,
                user_text: record.user_text,
                created_at: record.created_at,
                session_id: record
                    .session_id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| fallback_session_id.to_string()),
                reply: Reply::Completed {
                    assistant_text: record.assistant_text,
                    backend_id: Some(record.backend_id),
                    venues: record.venues,
                },
            });
        }

        tracing::debug!("[Ledger] Hydrated {} exchange(s) from history", count);
        Ok(count)
    }

    /// Appends the synthetic welcome exchange of a fresh session.
    pub fn append_welcome(
        &mut self,
        text: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<ExchangeIndex> {
        if !self.exchanges.is_empty() {
            return Err(self.fault("welcome exchange must be the first entry"));
        }

        let index = self.allocate_index();
        self.exchanges.push(Exchange {
            index,
            user_text: String::new(),
            created_at: Utc::now(),
            session_id: session_id.into(),
            reply: Reply::Completed {
                assistant_text: text.into(),
                backend_id: None,
                venues: Vec::new(),
            },
        });
        Ok(index)
    }

    /// Appends a provisional exchange for a message the user just submitted.
    pub fn append(
        &mut self,
        user_text: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<ExchangeHandle> {
        let user_text = user_text.into();
        if user_text.trim().is_empty() {
            return Err(ConciergeError::validation("message text is blank"));
        }
        if let Some(pending) = self.pending {
            return Err(self.fault(format!(
                "cannot append while exchange {} is still pending",
                pending
            )));
        }

        let index = self.allocate_index();
        self.exchanges.push(Exchange {
            index,
            user_text,
            created_at: Utc::now(),
            session_id: session_id.into(),
            reply: Reply::Pending,
        });
        self.pending = Some(index);

        tracing::debug!("[Ledger] Appended provisional exchange {}", index);
        Ok(ExchangeHandle { index })
    }

    /// Completes the provisional exchange with the backend's reply.
    pub fn complete(
        &mut self,
        handle: ExchangeHandle,
        assistant_text: impl Into<String>,
        backend_id: Option<BackendId>,
        session_id: impl Into<String>,
        venues: Vec<VenueSummary>,
    ) -> Result<&Exchange> {
        let exchange = self.take_pending(handle, "complete")?;
        exchange.session_id = session_id.into();
        exchange.reply = Reply::Completed {
            assistant_text: assistant_text.into(),
            backend_id,
            venues,
        };
        Ok(&*exchange)
    }

    /// Completes the provisional exchange with a user-facing error text.
    pub fn fail(
        &mut self,
        handle: ExchangeHandle,
        error_text: impl Into<String>,
    ) -> Result<&Exchange> {
        let exchange = self.take_pending(handle, "fail")?;
        exchange.reply = Reply::Failed {
            error_text: error_text.into(),
        };
        Ok(&*exchange)
    }

    /// `complete` applied to whichever exchange is currently provisional.
    pub fn complete_last(
        &mut self,
        assistant_text: impl Into<String>,
        backend_id: Option<BackendId>,
        session_id: impl Into<String>,
        venues: Vec<VenueSummary>,
    ) -> Result<&Exchange> {
        let handle = self.require_pending_handle("complete_last")?;
        self.complete(handle, assistant_text, backend_id, session_id, venues)
    }

    /// `fail` applied to whichever exchange is currently provisional.
    pub fn fail_last(&mut self, error_text: impl Into<String>) -> Result<&Exchange> {
        let handle = self.require_pending_handle("fail_last")?;
        self.fail(handle, error_text)
    }

    /// Ordered copy of all exchanges, to be rendered top-to-bottom.
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.exchanges.clone()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_handle(&self) -> Option<ExchangeHandle> {
        self.pending.map(|index| ExchangeHandle { index })
    }

    pub fn get(&self, index: ExchangeIndex) -> Option<&Exchange> {
        // Indices are sorted, so a binary search is enough.
        self.exchanges
            .binary_search_by_key(&index, |e| e.index)
            .ok()
            .map(|pos| &self.exchanges[pos])
    }

    pub fn find_by_backend_id(&self, backend_id: BackendId) -> Option<&Exchange> {
        self.exchanges
            .iter()
            .find(|e| e.backend_id() == Some(backend_id))
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    fn allocate_index(&mut self) -> ExchangeIndex {
        let index = ExchangeIndex(self.next_index);
        self.next_index += 1;
        index
    }

    fn require_pending_handle(&self, operation: &str) -> Result<ExchangeHandle> {
        self.pending_handle()
            .ok_or_else(|| self.fault(format!("{operation} called with no provisional exchange")))
    }

    fn take_pending(&mut self, handle: ExchangeHandle, operation: &str) -> Result<&mut Exchange> {
        match self.pending {
            Some(index) if index == handle.index => {}
            Some(index) => {
                return Err(self.fault(format!(
                    "{operation} called with handle {} but exchange {} is pending",
                    handle.index, index
                )));
            }
            None => {
                return Err(self.fault(format!(
                    "{operation} called with no provisional exchange"
                )));
            }
        }

        // The provisional exchange is always the last entry.
        match self.exchanges.last_mut() {
            Some(exchange) if exchange.index == handle.index => {
                self.pending = None;
                Ok(exchange)
            }
            _ => Err(ConciergeError::internal(
                "provisional exchange is not the last ledger entry",
            )),
        }
    }

    fn fault(&self, message: impl Into<String>) -> ConciergeError {
        let message = message.into();
        tracing::error!("[Ledger] Invalid state: {}", message);
        ConciergeError::invalid_state(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, user: &str, assistant: &str, session: Option<&str>) -> HistoryRecord {
        HistoryRecord {
            backend_id: BackendId(id),
            user_text: user.to_string(),
            assistant_text: assistant.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, id as u32, 0).unwrap(),
            session_id: session.map(str::to_string),
            venues: Vec::new(),
        }
    }

    #[test]
    fn test_append_then_complete() {
        let mut ledger = MessageLedger::new();
        ledger.append_welcome("hello", "s0").unwrap();

        let handle = ledger.append("sushi near me", "s0").unwrap();
        assert!(ledger.is_pending());
        assert_eq!(ledger.last().unwrap().assistant_text(), None);

        let venues = vec![VenueSummary::new(7, "Sushi Bar", Some("restaurant"), 0.9)];
        let exchange = ledger
            .complete(handle, "Try Sushi Bar", Some(BackendId(42)), "s1", venues)
            .unwrap();
        assert_eq!(exchange.assistant_text(), Some("Try Sushi Bar"));
        assert_eq!(exchange.backend_id(), Some(BackendId(42)));
        assert_eq!(exchange.session_id, "s1");
        assert_eq!(exchange.venues().len(), 1);

        assert!(!ledger.is_pending());
        // Welcome keeps its original session id.
        assert_eq!(ledger.exchanges()[0].session_id, "s0");
    }

    #[test]
    fn test_fail_keeps_entry_with_error_text() {
        let mut ledger = MessageLedger::new();
        let handle = ledger.append("hi", "s0").unwrap();
        ledger.fail(handle, "Something went wrong").unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_failed());
        assert_eq!(snapshot[0].assistant_text(), Some("Something went wrong"));
        assert_eq!(snapshot[0].backend_id(), None);
    }

    #[test]
    fn test_complete_last_without_pending_is_invalid_state() {
        let mut ledger = MessageLedger::new();
        let err = ledger
            .complete_last("text", None, "s0", Vec::new())
            .unwrap_err();
        assert!(err.is_invalid_state());

        let err = ledger.fail_last("oops").unwrap_err();
        assert!(err.is_invalid_state());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut ledger = MessageLedger::new();
        let first = ledger.append("one", "s0").unwrap();
        ledger.fail(first, "failed").unwrap();
        let _second = ledger.append("two", "s0").unwrap();

        let err = ledger.fail(first, "again").unwrap_err();
        assert!(err.is_invalid_state());
        assert!(ledger.is_pending());
    }

    #[test]
    fn test_append_while_pending_is_rejected() {
        let mut ledger = MessageLedger::new();
        ledger.append("one", "s0").unwrap();
        let err = ledger.append("two", "s0").unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_blank_append_is_validation_error() {
        let mut ledger = MessageLedger::new();
        let err = ledger.append("   \n", "s0").unwrap_err();
        assert!(err.is_validation());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_hydrate_only_on_empty_ledger() {
        let mut ledger = MessageLedger::new();
        let count = ledger
            .hydrate(
                vec![record(1, "a", "b", Some("s9")), record(2, "c", "d", None)],
                "fallback",
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(ledger.exchanges()[0].session_id, "s9");
        assert_eq!(ledger.exchanges()[1].session_id, "fallback");

        let err = ledger.hydrate(vec![record(3, "e", "f", None)], "x").unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_hydrate_treats_blank_session_as_missing() {
        let mut ledger = MessageLedger::new();
        ledger
            .hydrate(vec![record(1, "a", "b", Some(" "))], "fallback")
            .unwrap();
        assert_eq!(ledger.exchanges()[0].session_id, "fallback");
    }

    #[test]
    fn test_misplaced_provisional_keeps_pending_flag() {
        let mut ledger = MessageLedger::new();
        let handle = ledger.append("one", "s0").unwrap();
        let mut stray = ledger.exchanges[0].clone();
        stray.index = ExchangeIndex(99);
        ledger.exchanges.push(stray);

        let err = ledger.fail(handle, "failed").unwrap_err();
        assert!(matches!(err, ConciergeError::Internal(_)));
        assert!(ledger.is_pending());
        assert_eq!(ledger.pending_handle(), Some(handle));
        assert!(ledger.exchanges()[0].is_pending());
    }

    #[test]
    fn test_indices_strictly_increase_and_lookup() {
        let mut ledger = MessageLedger::new();
        ledger.hydrate(vec![record(5, "a", "b", None)], "s").unwrap();
        for text in ["x", "y", "z"] {
            let handle = ledger.append(text, "s").unwrap();
            ledger.fail(handle, "err").unwrap();
        }

        let snapshot = ledger.snapshot();
        assert!(snapshot.windows(2).all(|w| w[0].index < w[1].index));
        assert_eq!(ledger.get(ExchangeIndex(2)).unwrap().user_text, "y");
        assert_eq!(
            ledger.find_by_backend_id(BackendId(5)).unwrap().user_text,
            "a"
        );
        assert!(ledger.get(ExchangeIndex(99)).is_none());
    }

    #[test]
    fn test_welcome_is_not_rateable() {
        let mut ledger = MessageLedger::new();
        ledger.append_welcome("hello", "s").unwrap();
        let welcome = &ledger.exchanges()[0];
        assert!(welcome.is_welcome());
        assert!(!welcome.is_rateable());
    }
}
