//! Authentication module for managing technician sessions and credentials.
//!
//! This module provides:
//! - `SessionStore`: the token lifecycle contract the transport consumes
//! - `Session`: token pair management with login, refresh, and persistence
//! - `CredentialStore`: secure OS-level credential storage via keyring

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
pub use store::{SessionError, SessionStore, SharedSessionStore};
