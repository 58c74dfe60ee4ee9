//! Error types for the protocol crate.

use revsync_codec::RevisionId;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or interpreting protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Range bounds are reversed.
    #[error("invalid revision range: min {min:?} is greater than max {max:?}")]
    InvalidRange {
        /// Lower bound.
        min: RevisionId,
        /// Upper bound.
        max: RevisionId,
    },

    /// Two trees cannot be compared leaf by leaf.
    #[error("incompatible revision trees: {reason}")]
    IncompatibleTrees {
        /// What differs between the tree shapes.
        reason: String,
    },

    /// Snapshot handle is missing a batch id or collection name.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl ProtocolError {
    /// Creates an incompatible trees error.
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleTrees {
            reason: reason.into(),
        }
    }
}
