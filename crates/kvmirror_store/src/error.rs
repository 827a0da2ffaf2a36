//! Error types for the record store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with this key already exists.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },

    /// The underlying persistence backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::DuplicateKey { key: "a".into() };
        assert_eq!(err.to_string(), "duplicate key: a");

        let err = StoreError::backend("disk full");
        assert_eq!(err.to_string(), "backend error: disk full");
    }
}
