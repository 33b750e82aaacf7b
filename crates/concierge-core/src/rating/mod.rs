//! Rating workflow module.
//!
//! A small per-target state machine that collects a 1-5 score plus optional
//! free text and submits it independently of the message ledger.

mod workflow;

pub use workflow::{MAX_SCORE, RatingDraft, RatingState, RatingTarget, RatingWorkflow};
