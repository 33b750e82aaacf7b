use crate::ledger::HistoryRecord;
use uuid::Uuid;

/// The session token active for the current ledger.
///
/// Created once when the ledger is initialized, then immutable until the
/// backend returns a different value. The backend is authoritative and may
/// rotate the token; exchanges already in the ledger keep the value they
/// were created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    current: String,
}

impl SessionIdentity {
    /// Generates a fresh client-side session identifier.
    pub fn generate() -> Self {
        Self {
            current: format!("session_{}", Uuid::new_v4().simple()),
        }
    }

    /// Wraps a known session id. Blank ids fall back to a generated one.
    pub fn from_id(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        if session_id.trim().is_empty() {
            Self::generate()
        } else {
            Self {
                current: session_id,
            }
        }
    }

    /// Derives the identity from persisted history (oldest first).
    ///
    /// History is assumed to belong to a single session, so the earliest
    /// record that carries a session id wins. Without one, `hint` is used,
    /// and without a hint a fresh identifier is generated.
    pub fn from_history(history: &[HistoryRecord], hint: Option<&str>) -> Self {
        history
            .iter()
            .find_map(|record| {
                record
                    .session_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
            })
            .or(hint)
            .map(Self::from_id)
            .unwrap_or_else(Self::generate)
    }

    pub fn current_session_id(&self) -> &str {
        &self.current
    }

    /// Adopts the session id the backend returned.
    ///
    /// Returns `true` when the backend rotated the session. Blank values are ignored.
    pub fn adopt(&mut self, session_id: &str) -> bool {
        if session_id.trim().is_empty() || session_id == self.current {
            return false;
        }
        tracing::info!(
            "[Session] Backend rotated session {} -> {}",
            self.current,
            session_id
        );
        self.current = session_id.to_string();
        true
    }
}
