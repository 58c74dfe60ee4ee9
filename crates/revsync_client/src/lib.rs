//! # revsync Client
//!
//! Client side of revision-based replication.
//!
//! This crate provides:
//! - Revision tree fetch for a collection snapshot
//! - The range walk: paginated revision listing driven by a resume cursor
//! - Bulk document fetch by revision
//! - Transport abstraction, HTTP transport and test doubles
//!
//! ## Architecture
//!
//! A diff session runs in three steps, each a plain request/response
//! exchange with no background work:
//! 1. Fetch the [`RevisionTree`](revsync_protocol::RevisionTree) to learn
//!    which revision ranges need comparing
//! 2. Walk those ranges with [`ReplicationClient::walk_ranges`] to get the
//!    exact revisions present
//! 3. Materialize documents with [`ReplicationClient::revision_documents`]
//!
//! ## Key Invariants
//!
//! - The walk ends only when the server returns a zero resume cursor
//! - Walk rows follow input range order; the document result may be shorter
//!   than the request
//! - Every failure aborts the call; nothing is retried internally
//! - Revisions always cross the wire in their encoded string form
//!
//! The snapshot batch behind a [`Snapshot`](revsync_protocol::Snapshot) is
//! owned by the caller, who must keep it alive for the whole session.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod context;
mod error;
mod fetcher;
mod http;
mod transport;
mod walker;

pub use client::ReplicationClient;
pub use config::{ClientConfig, DEFAULT_DATABASE};
pub use context::CallContext;
pub use error::{ReplicationError, ReplicationResult, UNSUPPORTED_REPLICATION_MESSAGE};
pub use fetcher::DocumentFetch;
pub use http::{
    HttpClient, HttpReply, HttpRequest, HttpTransport, LoopbackClient, LoopbackRequest,
    LoopbackServer,
};
pub use transport::{MockTransport, Request, Response, Transport, STATUS_OK};
pub use walker::{RangeWalk, RangeWalker};
