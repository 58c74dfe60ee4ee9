//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a body.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a body.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A byte outside the revision alphabet (strict decoding only).
    #[error("invalid revision symbol {symbol:#04x} at position {position}")]
    InvalidSymbol {
        /// The offending byte.
        symbol: u8,
        /// Offset within the unquoted input.
        position: usize,
    },

    /// Encoded revision starts with the zero symbol (strict decoding only).
    #[error("revision has a leading zero symbol")]
    LeadingZero,

    /// Encoded revision does not fit in 64 bits (strict decoding only).
    #[error("revision overflows 64 bits")]
    RevisionOverflow,
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::InvalidSymbol {
            symbol: b'!',
            position: 3,
        };
        assert_eq!(err.to_string(), "invalid revision symbol 0x21 at position 3");

        let err = CodecError::decoding_failed("unexpected end of input");
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
