//! # revsync Testkit
//!
//! Test utilities for revsync.
//!
//! This crate provides:
//! - [`MemoryReplica`], an in-memory server for the tree, ranges and
//!   documents endpoints, with snapshot batches, configurable page size,
//!   failure injection and the unsupported-mode error
//! - [`TreeLayout`], the leaf partitioning the replica builds its trees with
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use revsync_client::{CallContext, ClientConfig, ReplicationClient};
//! use revsync_testkit::prelude::*;
//! use std::sync::Arc;
//!
//! let replica = Arc::new(MemoryReplica::new().with_page_size(3));
//! replica.populate("users", 1..=10);
//! let batch = replica.create_batch();
//! let client = ReplicationClient::new(replica.transport()?, ClientConfig::default());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;
mod layout;
mod replica;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::generators::*;
    pub use crate::layout::{TreeLayout, TREE_VERSION};
    pub use crate::replica::{MemoryReplica, ReplicaTransport, DEFAULT_PAGE_SIZE};
}

pub use generators::*;
pub use layout::{TreeLayout, TREE_VERSION};
pub use replica::{MemoryReplica, ReplicaTransport, DEFAULT_PAGE_SIZE};
