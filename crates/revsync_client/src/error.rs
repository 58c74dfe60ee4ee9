//! Error types for the replication client.

use revsync_codec::CodecError;
use revsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Message the server sends when a collection cannot be diffed by revision.
pub const UNSUPPORTED_REPLICATION_MESSAGE: &str =
    "this collection doesn't support revision-based replication";

/// Errors that can occur during replication calls.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The call was cancelled through its context.
    #[error("request cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("operation timed out")]
    Timeout,

    /// Non-success status without an error envelope.
    #[error("unexpected status {status} (expected {expected})")]
    UnexpectedStatus {
        /// Status the call requires.
        expected: u16,
        /// Status received.
        status: u16,
    },

    /// Failure reported by the server in an error envelope.
    #[error("server error {status}: {message}")]
    Remote {
        /// Status received.
        status: u16,
        /// Server-specific error number.
        error_num: Option<i64>,
        /// Server message.
        message: String,
    },

    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// The server broke the paging protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid request arguments.
    #[error("invalid request: {0}")]
    Invalid(#[from] ProtocolError),

    /// A server or request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ReplicationError {
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

    /// Returns true if the caller may retry the call.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReplicationError::Transport { retryable, .. } => *retryable,
            ReplicationError::Timeout => true,
            ReplicationError::UnexpectedStatus { status, .. }
            | ReplicationError::Remote { status, .. } => *status == 503,
            _ => false,
        }
    }

    /// Returns true if the server refused revision-based replication for the collection.
    ///
    /// The server only signals this through its message text, so this is the
    /// one place that compares it.
    pub fn is_unsupported_replication(&self) -> bool {
        matches!(
            self,
            ReplicationError::Remote { message, .. } if message == UNSUPPORTED_REPLICATION_MESSAGE
        )
    }
}

impl From<CodecError> for ReplicationError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncodingFailed { message } => Self::Encode(message),
            other => Self::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ReplicationError::transport_retryable("connection reset").is_retryable());
        assert!(!ReplicationError::transport_fatal("bad certificate").is_retryable());
        assert!(ReplicationError::Timeout.is_retryable());
        assert!(!ReplicationError::Cancelled.is_retryable());
        assert!(!ReplicationError::Decode("eof".into()).is_retryable());
        assert!(ReplicationError::UnexpectedStatus {
            expected: 200,
            status: 503
        }
        .is_retryable());
    }

    #[test]
    fn unsupported_replication_matches_exact_text() {
        let err = ReplicationError::Remote {
            status: 501,
            error_num: Some(9),
            message: UNSUPPORTED_REPLICATION_MESSAGE.into(),
        };
        assert!(err.is_unsupported_replication());

        let err = ReplicationError::Remote {
            status: 501,
            error_num: Some(9),
            message: "not implemented".into(),
        };
        assert!(!err.is_unsupported_replication());
        assert!(!ReplicationError::Timeout.is_unsupported_replication());
    }

    #[test]
    fn codec_errors_map_by_direction() {
        let err: ReplicationError = CodecError::encoding_failed("boom").into();
        assert!(matches!(err, ReplicationError::Encode(_)));
        let err: ReplicationError = CodecError::decoding_failed("eof").into();
        assert!(matches!(err, ReplicationError::Decode(_)));
    }

    #[test]
    fn error_display() {
        let err = ReplicationError::UnexpectedStatus {
            expected: 200,
            status: 404,
        };
        assert_eq!(err.to_string(), "unexpected status 404 (expected 200)");
    }
}
