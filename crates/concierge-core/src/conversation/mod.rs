//! Conversation module.
//!
//! The `ConversationController` drives one exchange at a time through the
//! ledger: optimistic append, backend round-trip, then completion or the
//! fallback reply.

mod controller;

pub use controller::{ConversationController, ConversationView, FALLBACK_REPLY, SendOutcome};
