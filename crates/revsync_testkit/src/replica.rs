//! In-memory replica serving the revision replication endpoints.
//!
//! [`MemoryReplica`] plays the remote side of a diff session. It keeps
//! collections in memory, hands out snapshot batches, pages range queries by
//! a resume cursor and builds a revision tree per snapshot. Plug it into
//! [`LoopbackClient`] to drive a [`ReplicationClient`](revsync_client::ReplicationClient)
//! end to end without a network.

use crate::layout::TreeLayout;
use parking_lot::Mutex;
use revsync_client::{
    HttpReply, HttpTransport, LoopbackClient, LoopbackRequest, LoopbackServer,
    ReplicationResult, DEFAULT_DATABASE, STATUS_OK, UNSUPPORTED_REPLICATION_MESSAGE,
};
use revsync_codec::WireFormat;
use revsync_protocol::{
    Document, Endpoint, ErrorBody, RangesPage, RevisionId, RevisionRange, BATCH_ID_PARAM,
    COLLECTION_PARAM, KEY_FIELD, RESUME_PARAM, REVISION_FIELD,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Revisions per range page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 100;

const ERROR_BAD_PARAMETER: i64 = 10;
const ERROR_NOT_IMPLEMENTED: i64 = 9;
const ERROR_METHOD_NOT_ALLOWED: i64 = 405;
const ERROR_DATABASE_NOT_FOUND: i64 = 1228;
const ERROR_COLLECTION_NOT_FOUND: i64 = 1203;
const ERROR_BATCH_NOT_FOUND: i64 = 1220;

/// Transport that talks to a shared [`MemoryReplica`].
pub type ReplicaTransport = HttpTransport<LoopbackClient<Arc<MemoryReplica>>>;

#[derive(Debug, Clone, Default)]
struct Collection {
    by_revision: BTreeMap<RevisionId, Document>,
    by_key: HashMap<String, RevisionId>,
}

impl Collection {
    fn put(&mut self, revision: RevisionId, mut document: Document) {
        let key = match document.key() {
            Some(key) => key.to_string(),
            None => {
                let key = revision.get().to_string();
                document.insert(KEY_FIELD, Value::String(key.clone()));
                key
            }
        };
        document.insert(REVISION_FIELD, Value::String(revision.encode()));

        if let Some(previous) = self.by_key.insert(key, revision) {
            self.by_revision.remove(&previous);
        }
        self.by_revision.insert(revision, document);
    }

    fn remove(&mut self, key: &str) -> Option<RevisionId> {
        let revision = self.by_key.remove(key)?;
        self.by_revision.remove(&revision);
        Some(revision)
    }

    // Fills at most `page_size` revisions across `ranges`, skipping
    // everything below `resume`.
    fn page(&self, ranges: &[RevisionRange], resume: RevisionId, page_size: usize) -> RangesPage {
        let mut rows = vec![Vec::new(); ranges.len()];
        let mut taken = 0;
        let mut next = RevisionId::ZERO;

        'ranges: for (row, range) in rows.iter_mut().zip(ranges) {
            let start = range.min().max(resume);
            if start > range.max() {
                continue;
            }
            for revision in self.by_revision.range(start..=range.max()).map(|(r, _)| *r) {
                if taken == page_size {
                    next = revision;
                    break 'ranges;
                }
                row.push(revision);
                taken += 1;
            }
        }

        RangesPage::new(rows, next)
    }
}

#[derive(Debug, Default)]
struct ReplicaState {
    next_revision: u64,
    collections: BTreeMap<String, Collection>,
    batches: HashMap<String, BTreeMap<String, Collection>>,
    next_batch: u64,
    unsupported: HashSet<String>,
    failures: BTreeSet<u64>,
    request_count: u64,
}

/// An in-memory database answering replication requests.
///
/// Every batch is a frozen copy of all collections at creation time; later
/// writes never show through an existing batch.
#[derive(Debug)]
pub struct MemoryReplica {
    database: String,
    page_size: usize,
    layout: TreeLayout,
    state: Mutex<ReplicaState>,
}

impl MemoryReplica {
    /// Creates an empty replica for the default database.
    pub fn new() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            layout: TreeLayout::default(),
            state: Mutex::new(ReplicaState {
                next_revision: 1,
                next_batch: 1,
                ..ReplicaState::default()
            }),
        }
    }

    /// Serves a different database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the number of revisions per range page (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the tree layout.
    pub fn with_layout(mut self, layout: TreeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Database name served.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Revisions per range page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Tree layout.
    pub fn layout(&self) -> TreeLayout {
        self.layout
    }

    /// Wraps the replica in a transport reaching it through the loopback client.
    pub fn transport(self: &Arc<Self>) -> ReplicationResult<ReplicaTransport> {
        HttpTransport::connect("http://replica.local/", LoopbackClient::new(Arc::clone(self)))
    }

    /// Stores `document` under a fresh revision and returns it.
    ///
    /// A document without `_key` gets the revision number as key. Storing
    /// an existing key replaces the older revision.
    pub fn insert(&self, collection: &str, document: Document) -> RevisionId {
        let mut state = self.state.lock();
        let revision = RevisionId::new(state.next_revision);
        state.next_revision += 1;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .put(revision, document);
        revision
    }

    /// Stores `document` under an explicit revision.
    ///
    /// Returns false, storing nothing, for revision zero.
    pub fn insert_at(&self, collection: &str, revision: RevisionId, document: Document) -> bool {
        if revision.is_zero() {
            return false;
        }
        let mut state = self.state.lock();
        state.next_revision = state.next_revision.max(revision.get().saturating_add(1));
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .put(revision, document);
        true
    }

    /// Stores one small document per revision. Zero is skipped.
    pub fn populate(&self, collection: &str, revisions: impl IntoIterator<Item = u64>) {
        for value in revisions {
            let mut document = Document::new();
            document.insert(KEY_FIELD, Value::String(format!("k{value}")));
            document.insert("value", Value::from(value));
            self.insert_at(collection, RevisionId::new(value), document);
        }
    }

    /// Removes the document with `key`, returning its revision.
    pub fn remove(&self, collection: &str, key: &str) -> Option<RevisionId> {
        self.state.lock().collections.get_mut(collection)?.remove(key)
    }

    /// Live revisions of a collection, ascending.
    pub fn revisions(&self, collection: &str) -> Vec<RevisionId> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|c| c.by_revision.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Live document with `revision`, if any.
    pub fn document(&self, collection: &str, revision: RevisionId) -> Option<Document> {
        self.state
            .lock()
            .collections
            .get(collection)?
            .by_revision
            .get(&revision)
            .cloned()
    }

    /// Freezes all collections into a new batch and returns its id.
    pub fn create_batch(&self) -> String {
        let mut state = self.state.lock();
        let id = state.next_batch.to_string();
        state.next_batch += 1;
        let frozen = state.collections.clone();
        state.batches.insert(id.clone(), frozen);
        id
    }

    /// Drops a batch. Returns false if it did not exist.
    pub fn drop_batch(&self, batch_id: &str) -> bool {
        self.state.lock().batches.remove(batch_id).is_some()
    }

    /// Makes every request on `collection` fail with the unsupported-mode error.
    pub fn mark_unsupported(&self, collection: &str) {
        self.state.lock().unsupported.insert(collection.to_string());
    }

    /// Makes request number `ordinal` (1-based, counted over the replica's
    /// lifetime) fail at the connection level.
    pub fn fail_request(&self, ordinal: u64) {
        self.state.lock().failures.insert(ordinal);
    }

    /// Number of requests received, failed ones included.
    pub fn request_count(&self) -> u64 {
        self.state.lock().request_count
    }

    /// Copies the live collections into a new replica with the same settings.
    ///
    /// Batches, failures and counters are not carried over.
    pub fn fork(&self) -> MemoryReplica {
        let state = self.state.lock();
        MemoryReplica {
            database: self.database.clone(),
            page_size: self.page_size,
            layout: self.layout,
            state: Mutex::new(ReplicaState {
                next_revision: state.next_revision,
                collections: state.collections.clone(),
                unsupported: state.unsupported.clone(),
                next_batch: 1,
                ..ReplicaState::default()
            }),
        }
    }

    fn route(
        &self,
        state: &ReplicaState,
        request: &LoopbackRequest,
        format: WireFormat,
    ) -> Result<HttpReply, ErrorBody> {
        let (database, endpoint) = Endpoint::parse_path(&request.path).ok_or_else(|| {
            ErrorBody::new(404, 404, format!("unknown path '{}'", request.path))
        })?;
        if database != self.database {
            return Err(ErrorBody::new(
                404,
                ERROR_DATABASE_NOT_FOUND,
                "database not found",
            ));
        }
        if request.method != endpoint.method() {
            return Err(ErrorBody::new(
                405,
                ERROR_METHOD_NOT_ALLOWED,
                "method not supported",
            ));
        }

        let batch_id = required_param(request, BATCH_ID_PARAM)?;
        let name = required_param(request, COLLECTION_PARAM)?;
        if state.unsupported.contains(name) {
            return Err(ErrorBody::new(
                501,
                ERROR_NOT_IMPLEMENTED,
                UNSUPPORTED_REPLICATION_MESSAGE,
            ));
        }
        let batch = state.batches.get(batch_id).ok_or_else(|| {
            ErrorBody::new(404, ERROR_BATCH_NOT_FOUND, "replication batch not found")
        })?;
        let collection = batch.get(name).ok_or_else(|| {
            ErrorBody::new(
                404,
                ERROR_COLLECTION_NOT_FOUND,
                "collection or view not found",
            )
        })?;

        match endpoint {
            Endpoint::Tree => {
                let tree = self.layout.build(collection.by_revision.keys().copied());
                Ok(reply(STATUS_OK, format, &tree))
            }
            Endpoint::Ranges => {
                let ranges: Vec<RevisionRange> = parse_body(request, format)?;
                let resume = request
                    .query_param(RESUME_PARAM)
                    .map(RevisionId::decode)
                    .unwrap_or_default();
                let page = collection.page(&ranges, resume, self.page_size);
                Ok(reply(STATUS_OK, format, &page))
            }
            Endpoint::Documents => {
                let revisions: Vec<RevisionId> = parse_body(request, format)?;
                let documents: Vec<&Document> = revisions
                    .iter()
                    .filter_map(|revision| collection.by_revision.get(revision))
                    .collect();
                Ok(reply(STATUS_OK, format, &documents))
            }
        }
    }
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackServer for MemoryReplica {
    fn handle(&self, request: LoopbackRequest) -> Result<HttpReply, String> {
        let mut state = self.state.lock();
        state.request_count += 1;
        let ordinal = state.request_count;
        if state.failures.remove(&ordinal) {
            return Err(format!("connection reset on request {ordinal}"));
        }

        let format = WireFormat::from_content_type(&request.content_type).unwrap_or_default();
        Ok(self
            .route(&state, &request, format)
            .unwrap_or_else(|error| {
                let status = error.code.unwrap_or(500);
                reply(status, format, &error)
            }))
    }
}

fn required_param<'a>(request: &'a LoopbackRequest, name: &str) -> Result<&'a str, ErrorBody> {
    request
        .query_param(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ErrorBody::new(
                400,
                ERROR_BAD_PARAMETER,
                format!("required parameter '{name}' missing"),
            )
        })
}

fn parse_body<T: serde::de::DeserializeOwned>(
    request: &LoopbackRequest,
    format: WireFormat,
) -> Result<T, ErrorBody> {
    format
        .from_slice(&request.body)
        .map_err(|e| ErrorBody::new(400, ERROR_BAD_PARAMETER, e.to_string()))
}

fn reply<T: Serialize + ?Sized>(status: u16, format: WireFormat, body: &T) -> HttpReply {
    match format.to_vec(body) {
        Ok(bytes) => HttpReply {
            status,
            content_type: Some(format.content_type().to_string()),
            body: bytes,
        },
        Err(e) => HttpReply {
            status: 500,
            content_type: None,
            body: e.to_string().into_bytes(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_protocol::{Method, RevisionTree};

    fn rev(n: u64) -> RevisionId {
        RevisionId::new(n)
    }

    fn request(endpoint: Endpoint, query: &[(&str, &str)], body: Vec<u8>) -> LoopbackRequest {
        LoopbackRequest {
            method: endpoint.method(),
            path: endpoint.path(DEFAULT_DATABASE),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            content_type: WireFormat::Json.content_type().to_string(),
            body,
        }
    }

    fn ranges_request(batch: &str, ranges: &[RevisionRange], resume: &str) -> LoopbackRequest {
        request(
            Endpoint::Ranges,
            &[("batchId", batch), ("collection", "c"), ("resume", resume)],
            serde_json::to_vec(ranges).unwrap(),
        )
    }

    fn page(replica: &MemoryReplica, request: LoopbackRequest) -> RangesPage {
        let reply = replica.handle(request).unwrap();
        assert_eq!(reply.status, STATUS_OK);
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn range(min: u64, max: u64) -> RevisionRange {
        RevisionRange::new(rev(min), rev(max)).unwrap()
    }

    #[test]
    fn pages_follow_resume() {
        let replica = MemoryReplica::new().with_page_size(2);
        replica.populate("c", [1, 2, 3, 5, 8]);
        let batch = replica.create_batch();

        let first = page(&replica, ranges_request(&batch, &[range(1, 10)], ""));
        assert_eq!(first.ranges, vec![vec![rev(1), rev(2)]]);
        assert_eq!(first.resume, rev(3));

        let second = page(
            &replica,
            ranges_request(&batch, &[range(1, 10)], &first.resume.encode()),
        );
        assert_eq!(second.ranges, vec![vec![rev(3), rev(5)]]);

        let last = page(
            &replica,
            ranges_request(&batch, &[range(1, 10)], &second.resume.encode()),
        );
        assert_eq!(last.ranges, vec![vec![rev(8)]]);
        assert!(last.is_last());
    }

    #[test]
    fn page_spans_ranges_in_order() {
        let replica = MemoryReplica::new().with_page_size(3);
        replica.populate("c", [1, 2, 10, 11, 20]);
        let batch = replica.create_batch();

        let ranges = [range(1, 5), range(9, 12), range(15, 25)];
        let first = page(&replica, ranges_request(&batch, &ranges, ""));
        assert_eq!(first.ranges, vec![vec![rev(1), rev(2)], vec![rev(10)], vec![]]);
        assert_eq!(first.resume, rev(11));

        let second = page(
            &replica,
            ranges_request(&batch, &ranges, &first.resume.encode()),
        );
        assert_eq!(second.ranges, vec![vec![], vec![rev(11)], vec![rev(20)]]);
        assert!(second.is_last());
    }

    #[test]
    fn exact_multiple_ends_without_empty_page() {
        let replica = MemoryReplica::new().with_page_size(2);
        replica.populate("c", [1, 2, 3, 4]);
        let batch = replica.create_batch();
        let first = page(&replica, ranges_request(&batch, &[range(1, 4)], ""));
        let second = page(
            &replica,
            ranges_request(&batch, &[range(1, 4)], &first.resume.encode()),
        );
        assert_eq!(second.ranges, vec![vec![rev(3), rev(4)]]);
        assert!(second.is_last());
    }

    #[test]
    fn batch_is_frozen() {
        let replica = MemoryReplica::new();
        replica.populate("c", [1, 2]);
        let batch = replica.create_batch();
        replica.populate("c", [3]);

        let reply = replica
            .handle(request(
                Endpoint::Tree,
                &[("batchId", batch.as_str()), ("collection", "c")],
                Vec::new(),
            ))
            .unwrap();
        let tree: RevisionTree = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(tree.document_count(), 2);
        assert_eq!(replica.revisions("c").len(), 3);
    }

    #[test]
    fn documents_skip_missing_revisions() {
        let replica = MemoryReplica::new();
        replica.populate("c", [4, 6]);
        let batch = replica.create_batch();

        let body = serde_json::to_vec(&[rev(4), rev(5), rev(6)]).unwrap();
        let reply = replica
            .handle(request(
                Endpoint::Documents,
                &[("batchId", batch.as_str()), ("collection", "c")],
                body,
            ))
            .unwrap();
        let docs: Vec<Document> = serde_json::from_slice(&reply.body).unwrap();
        let revisions: Vec<_> = docs.iter().filter_map(Document::revision).collect();
        assert_eq!(revisions, vec![rev(4), rev(6)]);
        assert_eq!(docs[0].key(), Some("k4"));
    }

    #[test]
    fn replacing_a_key_drops_the_old_revision() {
        let replica = MemoryReplica::new();
        let mut doc = Document::new();
        doc.insert(KEY_FIELD, Value::from("alice"));
        let first = replica.insert("users", doc.clone());
        let second = replica.insert("users", doc);
        assert!(second > first);
        assert_eq!(replica.revisions("users"), vec![second]);
        assert_eq!(replica.remove("users", "alice"), Some(second));
        assert!(replica.revisions("users").is_empty());
    }

    #[test]
    fn zero_revision_rejected() {
        let replica = MemoryReplica::new();
        assert!(!replica.insert_at("c", RevisionId::ZERO, Document::new()));
        assert!(replica.revisions("c").is_empty());
    }

    #[test]
    fn error_envelopes() {
        let replica = MemoryReplica::new();
        replica.populate("c", [1]);
        replica.mark_unsupported("smart");
        let batch = replica.create_batch();

        let unknown_batch = replica
            .handle(request(
                Endpoint::Tree,
                &[("batchId", "999"), ("collection", "c")],
                Vec::new(),
            ))
            .unwrap();
        assert_eq!(unknown_batch.status, 404);

        let unsupported = replica
            .handle(request(
                Endpoint::Tree,
                &[("batchId", batch.as_str()), ("collection", "smart")],
                Vec::new(),
            ))
            .unwrap();
        assert_eq!(unsupported.status, 501);
        let body: ErrorBody = serde_json::from_slice(&unsupported.body).unwrap();
        assert_eq!(
            body.error_message.as_deref(),
            Some(UNSUPPORTED_REPLICATION_MESSAGE)
        );

        let mut wrong_method = request(
            Endpoint::Tree,
            &[("batchId", batch.as_str()), ("collection", "c")],
            Vec::new(),
        );
        wrong_method.method = Method::Put;
        assert_eq!(replica.handle(wrong_method).unwrap().status, 405);

        let missing_param = replica
            .handle(request(Endpoint::Tree, &[("collection", "c")], Vec::new()))
            .unwrap();
        assert_eq!(missing_param.status, 400);
    }

    #[test]
    fn injected_failure_hits_one_request() {
        let replica = MemoryReplica::new();
        replica.populate("c", [1]);
        let batch = replica.create_batch();
        replica.fail_request(2);

        let tree = || {
            request(
                Endpoint::Tree,
                &[("batchId", batch.as_str()), ("collection", "c")],
                Vec::new(),
            )
        };
        assert!(replica.handle(tree()).is_ok());
        assert!(replica.handle(tree()).is_err());
        assert!(replica.handle(tree()).is_ok());
        assert_eq!(replica.request_count(), 3);
    }

    #[test]
    fn fork_copies_data_only() {
        let replica = MemoryReplica::new().with_page_size(7);
        replica.populate("c", [1, 2]);
        replica.create_batch();
        let fork = replica.fork();
        fork.populate("c", [3]);
        assert_eq!(fork.page_size(), 7);
        assert_eq!(replica.revisions("c").len(), 2);
        assert_eq!(fork.revisions("c").len(), 3);
        assert!(!fork.drop_batch("1"));
        assert!(replica.drop_batch("1"));
    }
}
