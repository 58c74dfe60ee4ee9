//! # revsync Protocol
//!
//! Wire types for revision-based replication.
//!
//! This crate provides:
//! - [`RevisionTree`], the read-only Merkle summary of a collection
//! - [`RevisionRange`] and [`RangesPage`] for paginated range queries
//! - [`Document`] for schema-free document bodies
//! - Endpoint paths and request descriptions for the tree, ranges and
//!   documents calls
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod messages;
mod range;
mod tree;

pub use document::{Document, KEY_FIELD, REVISION_FIELD};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    DocumentsRequest, Endpoint, ErrorBody, Method, RangesRequest, Snapshot, TreeRequest,
    BATCH_ID_PARAM, COLLECTION_PARAM, RESUME_PARAM,
};
pub use range::{RangesPage, RevisionRange};
pub use tree::{RevisionTree, RevisionTreeNode};

pub use revsync_codec::RevisionId;
