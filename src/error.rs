// Client-facing error types
use thiserror::Error;

/// Errors surfaced by the Aquawatch client.
///
/// Only `Authentication` is meant to reach end users directly; the session
/// layer absorbs `SessionUnavailable` and `MalformedResponse` by treating the
/// session as absent and letting the next reconciliation cycle recover.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Login rejected by the server. Carries the server-supplied message
    /// when one was provided, otherwise a generic fallback.
    #[error("{0}")]
    Authentication(String),

    /// Transient network or server failure while checking the session.
    #[error("session check failed: {0}")]
    SessionUnavailable(String),

    /// The server returned a session payload missing required fields.
    #[error("malformed session payload: {0}")]
    MalformedResponse(String),

    /// The server flagged this account as deleted (401 + `accountDeleted`).
    #[error("account has been deleted by an administrator")]
    AccountDeleted,

    /// Non-OK data-plane response with the backend's message extracted.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The inference upstream timed out, usually a cold start.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// The backend or its upstream is temporarily unreachable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn authentication(message: impl Into<String>) -> Self {
        ClientError::Authentication(message.into())
    }

    pub fn session_unavailable(message: impl Into<String>) -> Self {
        ClientError::SessionUnavailable(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ClientError::MalformedResponse(message.into())
    }

    /// Map a non-OK data-plane status to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            504 => ClientError::UpstreamTimeout(message),
            503 => ClientError::ServiceUnavailable(message),
            _ => ClientError::Api { status, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
