//! Session domain module.
//!
//! Owns the opaque token that groups exchanges into one logical conversation
//! on the backend.

mod identity;

pub use identity::SessionIdentity;
