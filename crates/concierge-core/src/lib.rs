//! Conversation core of the Concierge venue-chat client.
//!
//! # Module Structure
//!
//! - `session`: Session identity (`SessionIdentity`)
//! - `ledger`: Exchanges and the append-only `MessageLedger`
//! - `conversation`: `ConversationController`, which drives send/reconcile
//! - `recommendation`: `RecommendationSurfacer` for the latest suggested venues
//! - `rating`: `RatingWorkflow` state machine
//! - `backend`: collaborator traits implemented by the transport layer
//! - `auth`, `venue`, `config`: domain models
//! - `error`: the shared `ConciergeError`

pub mod auth;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ledger;
pub mod rating;
pub mod recommendation;
pub mod session;
pub mod venue;

// Re-export common error type
pub use error::{ConciergeError, Result};
