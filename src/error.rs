//! Failure types for a single query round-trip.
//!
//! Every variant is terminal for the submission that produced it. The TUI
//! only ever shows [`QueryError::user_message`], so backend, transport and
//! decoding failures collapse into one visible error slot.

use reqwest::StatusCode;

/// Shown whenever the backend gave us nothing better to display.
pub const FALLBACK_ERROR: &str = "Sorry, something went wrong. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Non-success status from the backend.
    #[error("backend returned {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Backend {
        status: StatusCode,
        detail: Option<String>,
    },

    /// Success status, but the body had no usable `answer`.
    #[error("malformed answer payload: {0}")]
    MalformedAnswer(#[source] serde_json::Error),

    /// No response at all (connection refused, reset, DNS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The background task died before producing a result.
    #[error("query task failed: {0}")]
    TaskFailed(String),
}

impl QueryError {
    /// Text for the error banner: the server's own detail when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Backend {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => FALLBACK_ERROR.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            QueryError::Backend { status, .. } => Some(*status),
            QueryError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
