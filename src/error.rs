//! Error types for the extraction pipeline.
//!
//! The taxonomy mirrors how failures are handled, not where they occur:
//!
//! - [`SessionError`]: reported by the page-interaction capability. The
//!   `Timeout` variant is special-cased throughout — a bounded wait running
//!   out is usually a soft condition (null the field, take the fallback),
//!   while every other variant is a session-level fault.
//! - [`ExtractError`]: raised inside one article's extraction. Any value
//!   terminates that extraction in a partial state; nothing propagates to
//!   sibling tasks.
//! - [`StoreError`]: persistence and remote-store faults.

use thiserror::Error;

/// Errors reported by a [`PageSession`](crate::session::PageSession).
#[derive(Debug, Error)]
pub enum SessionError {
    /// A bounded element wait expired without the element appearing.
    #[error("timed out waiting for element: {selector}")]
    Timeout { selector: String },

    /// The automation endpoint rejected a command.
    #[error("driver error (status {status}): {message}")]
    Driver { status: u16, message: String },

    /// Transport-level failure talking to the automation endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// The driver returned a payload we could not interpret.
    #[error("malformed driver response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}

/// Errors that terminate a single article's extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The emulate-vote fallback itself timed out. This indicates a
    /// structural page change, so it is an extraction failure rather than a
    /// "moods not found" outcome.
    #[error("moodmeter interaction failed on {selector}")]
    Interaction { selector: String },

    /// The underlying session reported a non-timeout fault.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors from persisting records locally or remotely.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Remote(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_the_selector() {
        let timeout = SessionError::Timeout {
            selector: "//h1".to_string(),
        };
        assert!(timeout.to_string().contains("//h1"));
    }

    #[test]
    fn test_session_error_wraps_into_extract_error() {
        let err: ExtractError = SessionError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, ExtractError::Session(_)));
    }

    #[test]
    fn test_error_messages_name_the_selector() {
        let err = ExtractError::Interaction {
            selector: "//div[contains(@class,'mood-happy')]".to_string(),
        };
        assert!(err.to_string().contains("mood-happy"));
    }
}
