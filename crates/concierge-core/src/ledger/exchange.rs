//! Exchange types.
//!
//! An exchange is one user message paired with its assistant reply. The reply
//! is a tagged variant, so "no assistant text yet" is a state of the type and
//! not an empty string convention.

use crate::venue::VenueSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an exchange in its ledger. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeIndex(pub u64);

impl fmt::Display for ExchangeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id the backend assigns to a stored exchange.
///
/// This is the only valid target of an answer rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(pub i64);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by `Ledger::append`, required to complete or fail the
/// provisional exchange it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeHandle {
    pub(crate) index: ExchangeIndex,
}

impl ExchangeHandle {
    pub fn index(&self) -> ExchangeIndex {
        self.index
    }
}

/// The assistant half of an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reply {
    /// Provisional: the request is in flight.
    Pending,
    /// The backend answered.
    Completed {
        assistant_text: String,
        backend_id: Option<BackendId>,
        #[serde(default)]
        venues: Vec<VenueSummary>,
    },
    /// The round-trip failed; `error_text` is the user-facing fallback.
    Failed { error_text: String },
}

/// The atomic unit of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub index: ExchangeIndex,
    /// Empty for the synthetic welcome exchange.
    pub user_text: String,
    /// Client-observed wall clock time.
    pub created_at: DateTime<Utc>,
    pub session_id: String,
    pub reply: Reply,
}

impl Exchange {
    pub fn is_pending(&self) -> bool {
        matches!(self.reply, Reply::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.reply, Reply::Failed { .. })
    }

    /// True for the synthetic welcome exchange (no user half).
    pub fn is_welcome(&self) -> bool {
        self.user_text.is_empty()
    }

    /// The text shown in the assistant half, `None` while pending.
    pub fn assistant_text(&self) -> Option<&str> {
        match &self.reply {
            Reply::Pending => None,
            Reply::Completed { assistant_text, .. } => Some(assistant_text),
            Reply::Failed { error_text } => Some(error_text),
        }
    }

    pub fn backend_id(&self) -> Option<BackendId> {
        match &self.reply {
            Reply::Completed { backend_id, .. } => *backend_id,
            _ => None,
        }
    }

    pub fn venues(&self) -> &[VenueSummary] {
        match &self.reply {
            Reply::Completed { venues, .. } => venues,
            _ => &[],
        }
    }

    /// Whether the answer can be rated: only replies the backend stored.
    pub fn is_rateable(&self) -> bool {
        self.backend_id().is_some()
    }
}

/// An exchange as persisted by the history source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub backend_id: BackendId,
    pub user_text: String,
    pub assistant_text: String,
    pub created_at: DateTime<Utc>,
    /// Not every history endpoint reports the session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub venues: Vec<VenueSummary>,
}
