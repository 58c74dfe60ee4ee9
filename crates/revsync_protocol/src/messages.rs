//! Endpoints and request descriptions for revision-based replication.

use crate::error::{ProtocolError, ProtocolResult};
use crate::range::RevisionRange;
use revsync_codec::RevisionId;
use serde::{Deserialize, Serialize};

/// Query parameter carrying the snapshot batch id.
pub const BATCH_ID_PARAM: &str = "batchId";
/// Query parameter carrying the collection name.
pub const COLLECTION_PARAM: &str = "collection";
/// Query parameter carrying the encoded resume cursor.
pub const RESUME_PARAM: &str = "resume";

/// HTTP-style request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// PUT.
    Put,
}

impl Method {
    /// Canonical method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// The three replication endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Fetch the revision tree.
    Tree,
    /// List revisions inside ranges.
    Ranges,
    /// Fetch documents by revision.
    Documents,
}

impl Endpoint {
    /// Method used by this endpoint.
    pub fn method(self) -> Method {
        match self {
            Endpoint::Tree => Method::Get,
            Endpoint::Ranges | Endpoint::Documents => Method::Put,
        }
    }

    /// Last path segment.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Tree => "tree",
            Endpoint::Ranges => "ranges",
            Endpoint::Documents => "documents",
        }
    }

    /// Path of this endpoint inside `database`.
    pub fn path(self, database: &str) -> String {
        format!(
            "/_db/{database}/_api/replication/revisions/{}",
            self.name()
        )
    }

    /// Recognizes an endpoint path, returning the database name.
    pub fn parse_path(path: &str) -> Option<(&str, Endpoint)> {
        let rest = path.strip_prefix("/_db/")?;
        let (database, rest) = rest.split_once('/')?;
        let name = rest.strip_prefix("_api/replication/revisions/")?;
        let endpoint = match name {
            "tree" => Endpoint::Tree,
            "ranges" => Endpoint::Ranges,
            "documents" => Endpoint::Documents,
            _ => return None,
        };
        Some((database, endpoint))
    }
}

/// Error envelope sent by the server with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always true in an error envelope.
    #[serde(default)]
    pub error: bool,
    /// HTTP-style status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Server-specific error number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_num: Option<i64>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ErrorBody {
    /// Creates an error envelope.
    pub fn new(code: u16, error_num: i64, message: impl Into<String>) -> Self {
        Self {
            error: true,
            code: Some(code),
            error_num: Some(error_num),
            error_message: Some(message.into()),
        }
    }
}

/// A remote collection snapshot: batch handle plus collection name.
///
/// The batch is created, kept alive and deleted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    batch_id: String,
    collection: String,
}

impl Snapshot {
    /// Creates a snapshot handle.
    pub fn new(batch_id: impl Into<String>, collection: impl Into<String>) -> ProtocolResult<Self> {
        let batch_id = batch_id.into();
        let collection = collection.into();
        if batch_id.is_empty() {
            return Err(ProtocolError::InvalidSnapshot("empty batch id".into()));
        }
        if collection.is_empty() {
            return Err(ProtocolError::InvalidSnapshot("empty collection name".into()));
        }
        Ok(Self {
            batch_id,
            collection,
        })
    }

    /// Batch id.
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            (BATCH_ID_PARAM, self.batch_id.clone()),
            (COLLECTION_PARAM, self.collection.clone()),
        ]
    }
}

/// Request for the revision tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeRequest<'a> {
    /// Snapshot to read.
    pub snapshot: &'a Snapshot,
}

impl TreeRequest<'_> {
    /// Target endpoint.
    pub const ENDPOINT: Endpoint = Endpoint::Tree;

    /// Query parameters.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        self.snapshot.query()
    }
}

/// Request for one page of revisions inside `ranges`.
#[derive(Debug, Clone, Copy)]
pub struct RangesRequest<'a> {
    /// Snapshot to read.
    pub snapshot: &'a Snapshot,
    /// Ranges to list, in caller order.
    pub ranges: &'a [RevisionRange],
    /// Cursor from the previous page; zero for the first page.
    pub resume: RevisionId,
}

impl RangesRequest<'_> {
    /// Target endpoint.
    pub const ENDPOINT: Endpoint = Endpoint::Ranges;

    /// Query parameters. `resume` is omitted when zero.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = self.snapshot.query();
        if let Some(resume) = self.resume.non_zero() {
            query.push((RESUME_PARAM, resume.encode()));
        }
        query
    }

    /// Body: the `[min, max]` pairs.
    pub fn body(&self) -> &[RevisionRange] {
        self.ranges
    }
}

/// Request for the documents of a list of revisions.
#[derive(Debug, Clone, Copy)]
pub struct DocumentsRequest<'a> {
    /// Snapshot to read.
    pub snapshot: &'a Snapshot,
    /// Revisions whose documents are wanted.
    pub revisions: &'a [RevisionId],
}

impl DocumentsRequest<'_> {
    /// Target endpoint.
    pub const ENDPOINT: Endpoint = Endpoint::Documents;

    /// Query parameters.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        self.snapshot.query()
    }

    /// Body: the flat revision list.
    pub fn body(&self) -> &[RevisionId] {
        self.revisions
    }
}
