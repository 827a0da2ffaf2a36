//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Per-item conflicts (`e_tag_mismatch`, `parse_error`) are not errors at
/// this level; they are reported as data in the `set` response so one bad
/// item never fails the batch.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request envelope or body was malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A request filter rejected the envelope or failed.
    #[error("filter error: {0}")]
    Filter(String),

    /// A host hook or handler failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// Transaction-level persistence failure; the whole batch rolled back.
    #[error("store error: {0}")]
    Store(#[from] kvmirror_store::StoreError),

    /// Protocol encoding or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] kvmirror_protocol::ProtocolError),

    /// Network or transport error on the outbound call.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// The outbound call timed out.
    #[error("operation timed out")]
    Timeout,

    /// The operation was cancelled by shutdown.
    #[error("sync cancelled")]
    Cancelled,

    /// The authority rejected the request.
    #[error("server error: {0}")]
    ServerError(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the reconnect worker should retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Cancelled | SyncError::Store(_) => false,
            SyncError::Filter(_) | SyncError::Handler(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("bad certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::ServerError("internal error".into()).is_retryable());
        assert!(SyncError::Validation("bad body".into()).is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::Store(kvmirror_store::StoreError::backend("io")).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(SyncError::Cancelled.to_string(), "sync cancelled");
        assert_eq!(SyncError::Timeout.to_string(), "operation timed out");

        let err = SyncError::ServerError("overloaded".into());
        assert!(err.to_string().contains("overloaded"));
    }
}
