//! Error types for protocol encoding and envelope validation.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope was structurally valid JSON but not a valid request.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}

impl ProtocolError {
    /// Creates an invalid-envelope error.
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::invalid_envelope("missing channel");
        assert_eq!(err.to_string(), "invalid envelope: missing channel");
    }
}
