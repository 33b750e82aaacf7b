//! Local persistence for the Concierge client: platform paths, the
//! `config.toml` loader and the file-backed credential store.

pub mod config_storage;
pub mod credential_store;
pub mod paths;

pub use config_storage::ConfigStorage;
pub use credential_store::FileCredentialStore;
pub use paths::{ConciergePaths, PathError};
