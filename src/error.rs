//! Failures of the refresh contract.

use thiserror::Error;

/// Outcome of a failed refresh episode. Every caller that joined the episode
/// receives a clone of the same value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// Request never produced a response (connect error, timeout, TLS)
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-2xx status
    #[error("refresh endpoint responded with status {0}")]
    Status(u16),

    /// 2xx response without a usable access token
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    /// Persistent store could not be read or written
    #[error("session store error: {0}")]
    Storage(String),

    /// Refresh task ended without producing an outcome
    #[error("refresh interrupted: {0}")]
    Interrupted(String),
}

impl RefreshError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RefreshError::Transport(_) => "transport",
            RefreshError::Status(_) => "status",
            RefreshError::MalformedResponse(_) => "malformed_response",
            RefreshError::Storage(_) => "storage",
            RefreshError::Interrupted(_) => "interrupted",
        }
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RefreshError::Status(status.as_u16()),
            None => RefreshError::Transport(err.to_string()),
        }
    }
}
