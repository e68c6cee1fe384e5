//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionState`: the observable signed-in/anonymous state machine
//! - `CredentialStore`: durable token + profile storage (file, keyring or memory)
//!
//! A 401 from any request ends the session through the gateway's
//! unauthorized listeners.

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialBackend, CredentialRecord, CredentialStore, FileBackend, KeyringBackend, MemoryBackend,
};
pub use session::{SessionEvent, SessionSnapshot, SessionState};
