//! # revsync Codec
//!
//! Revision identifier encoding and body formats for revsync.
//!
//! This crate provides:
//! - [`RevisionId`], the 64-bit document revision identifier
//! - The compact, URL-safe text encoding of revisions
//! - [`WireFormat`] for JSON and CBOR request/response bodies
//!
//! ## Usage
//!
//! ```
//! use revsync_codec::{decode_revision, encode_revision, RevisionId};
//!
//! let revision = RevisionId::new(64);
//! let encoded = encode_revision(revision);
//! assert_eq!(encoded, "_-");
//! assert_eq!(decode_revision(encoded.as_bytes()), revision);
//!
//! // The zero revision means "absent" and encodes to nothing.
//! assert_eq!(encode_revision(RevisionId::ZERO), "");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;
mod revision;

pub use error::{CodecError, CodecResult};
pub use format::WireFormat;
pub use revision::{
    decode_revision, decode_revision_strict, encode_revision, encode_revision_into, RevisionId,
    MAX_ENCODED_LEN, REVISION_ALPHABET,
};
