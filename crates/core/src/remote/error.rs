use crate::agents::base::AgentError;
use std::time::Duration;
use thiserror::Error;

/// Failures of a remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Too many requests")]
    TooManyRequests { retry_after: Option<Duration> },

    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Rate limit queue is full ({queue_limit} callers waiting)")]
    RateLimited { queue_limit: usize },

    #[error("Request canceled")]
    Canceled,
}

impl RemoteError {
    /// Map a non-success HTTP-like status to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status == 429 {
            RemoteError::TooManyRequests { retry_after: None }
        } else {
            RemoteError::Status {
                status,
                message: message.into(),
            }
        }
    }

    /// Whether a retry may succeed: transport failures and "too many requests".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Transport(_) | RemoteError::TooManyRequests { .. }
        )
    }
}

impl From<RemoteError> for AgentError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Canceled => AgentError::Canceled,
            err => AgentError::Remote(err.to_string()),
        }
    }
}
