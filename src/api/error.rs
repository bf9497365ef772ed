use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::SessionError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Session refresh failed: {0}")]
    RefreshFailed(#[source] Arc<SessionError>),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape the gear service uses for failures. Some endpoints put
/// the text in `message`, older ones in `detail`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => TransportError::Unauthorized(truncated),
            403 => TransportError::Forbidden(truncated),
            404 => TransportError::NotFound(truncated),
            429 => TransportError::RateLimited,
            500..=599 => TransportError::Server {
                status: status.as_u16(),
                body: truncated,
            },
            other => TransportError::Status {
                status: other,
                body: truncated,
            },
        }
    }

    /// HTTP status this error was built from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Unauthorized(_) => Some(401),
            TransportError::Forbidden(_) => Some(403),
            TransportError::NotFound(_) => Some(404),
            TransportError::RateLimited => Some(429),
            TransportError::Server { status, .. } | TransportError::Status { status, .. } => {
                Some(*status)
            }
            TransportError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn body(&self) -> Option<&str> {
        match self {
            TransportError::Unauthorized(body)
            | TransportError::Forbidden(body)
            | TransportError::NotFound(body) => Some(body),
            TransportError::Server { body, .. } | TransportError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether this error signals an expired/invalid access token.
    ///
    /// Matches a 401/403 status, an error body whose `message`/`detail` text
    /// mentions an expired token, or a transport-level error text saying the
    /// token is expired. Anything else passes through without a refresh.
    pub fn is_auth_failure(&self) -> bool {
        if matches!(self.status(), Some(401) | Some(403)) {
            return true;
        }
        if let Some(body) = self.body() {
            if body_mentions_expired_token(body) {
                return true;
            }
        }
        let text = self.to_string().to_lowercase();
        text.contains("token is expired") || text.contains("token has expired")
    }
}

fn body_mentions_expired_token(body: &str) -> bool {
    let mentions = |text: &str| {
        let text = text.to_lowercase();
        text.contains("token") && text.contains("expired")
    };

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .message
            .iter()
            .chain(parsed.detail.iter())
            .any(|t| mentions(t)),
        // Not JSON - scan the raw body text instead.
        Err(_) => mentions(body),
    }
}
