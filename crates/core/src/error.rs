//! Error types for the Attaché domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Vendor transport
//! failures get their own `ApiError`; everything an agent handler can
//! surface lives in the top-level `Error`.

use thiserror::Error;

/// The top-level error type for agent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Vendor transport ---
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    // --- Local filesystem ---
    #[error("File read failed: {0}")]
    Io(#[from] std::io::Error),

    // --- Handler outcomes ---
    #[error("Thread message {message_id} contains no text content")]
    NoTextContent { message_id: String },

    #[error("Thread {thread_id} has no messages after run completion")]
    EmptyThread { thread_id: String },

    #[error("Vendor refused to delete thread message {message_id}")]
    DeleteRejected { message_id: String },

    #[error("Run {run_id} ended with status {status}")]
    RunEnded { run_id: String, status: String },

    #[error("Vector store batch {batch_id} ended with status {status}")]
    IndexingFailed { batch_id: String, status: String },

    /// The caller's cancellation token fired while a remote call was
    /// pending. Distinct from vendor errors so callers can tell an abort
    /// apart from a failure.
    #[error("Operation cancelled")]
    Cancelled,

    // --- Runtime delivery ---
    #[error("No agent registered as {name}/{key}")]
    UnknownAgent { name: String, key: String },

    #[error("Agent mailbox closed before a reply arrived")]
    MailboxClosed,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the vendor HTTP surface.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by vendor, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Event stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status() {
        let err = Error::Api(ApiError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn cancelled_is_not_an_api_error() {
        let err = Error::Cancelled;
        assert!(!matches!(err, Error::Api(_)));
        assert_eq!(err.to_string(), "Operation cancelled");
    }

    #[test]
    fn no_text_content_names_the_message() {
        let err = Error::NoTextContent {
            message_id: "msg_1".into(),
        };
        assert!(err.to_string().contains("msg_1"));
    }
}
