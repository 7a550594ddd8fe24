//! Client and session errors.

use thiserror::Error;

/// Errors from persisted session state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the session directory failed.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded as JSON.
    #[error("session encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Keys become file names, so only `[a-z0-9_-]` is accepted.
    #[error("invalid session key: {0:?}")]
    InvalidKey(String),

    /// A thread panicked while holding the in-memory store lock.
    #[error("session store lock poisoned")]
    Poisoned,
}

/// Errors from the REST client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The base URL plus a route did not form a URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A 2xx response lacked a field the route always sends.
    #[error("unexpected response: missing `{0}`")]
    UnexpectedResponse(&'static str),

    /// The route needs a signed-in session.
    #[error("not signed in")]
    NotSignedIn,

    /// Session state could not be read or written.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
