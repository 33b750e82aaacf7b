//! Message ledger module.
//!
//! - `exchange`: the `Exchange` record, its tagged `Reply` and the id newtypes
//! - `message_ledger`: the append-only `MessageLedger`

mod exchange;
mod message_ledger;

pub use exchange::{BackendId, Exchange, ExchangeHandle, ExchangeIndex, HistoryRecord, Reply};
pub use message_ledger::MessageLedger;
