//! Session store contract consumed by the transport layer.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh completed without an access token")]
    MissingToken,

    #[error("Login rejected with status {status}: {body}")]
    LoginRejected { status: u16, body: String },

    #[error("Refresh rejected with status {status}: {body}")]
    RefreshRejected { status: u16, body: String },

    #[error("Invalid auth endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Token lifecycle operations the transport relies on.
///
/// The getters are synchronous snapshots of current state. `refresh` must
/// make the new tokens visible through the getters before it returns, so a
/// caller that sees `refresh` succeed can immediately re-read the token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current access token, if a session is active.
    fn access_token(&self) -> Option<String>;

    /// Current refresh token, if a session is active.
    fn refresh_token(&self) -> Option<String>;

    /// Exchange the refresh token for a new token pair.
    async fn refresh(&self) -> Result<(), SessionError>;

    /// Tear down the session. Best effort against the backend; local state is
    /// always cleared.
    async fn logout(&self) -> Result<(), SessionError>;
}

/// Shared session store for use across async contexts.
pub type SharedSessionStore = Arc<dyn SessionStore>;
