//! Bulk document fetch by revision.
//!
//! Unlike the range walk, the documents endpoint may answer with fewer
//! documents than revisions requested, for example when a revision no
//! longer exists in the snapshot. A shorter result is not an error, and
//! positions only line up when the lengths match. [`DocumentFetch`] makes
//! that check explicit.

use crate::client::ReplicationClient;
use crate::context::CallContext;
use crate::error::ReplicationResult;
use crate::transport::Transport;
use revsync_protocol::{Document, DocumentsRequest, RevisionId, Snapshot};
use std::collections::HashMap;
use tracing::{info, warn};

/// Documents returned for a list of revisions.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFetch {
    requested: Vec<RevisionId>,
    documents: Vec<Document>,
}

impl DocumentFetch {
    /// Revisions that were asked for, in order.
    pub fn requested(&self) -> &[RevisionId] {
        &self.requested
    }

    /// Documents in the order the server returned them.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns true if one document came back per requested revision.
    pub fn is_complete(&self) -> bool {
        self.documents.len() == self.requested.len()
    }

    /// How many documents fewer than requested came back.
    pub fn missing(&self) -> usize {
        self.requested.len().saturating_sub(self.documents.len())
    }

    /// Pairs each requested revision with its document.
    ///
    /// A complete result is paired by position. Otherwise documents are
    /// matched through their `_rev` field, and revisions without a match map
    /// to `None`.
    pub fn by_revision(&self) -> Vec<(RevisionId, Option<&Document>)> {
        if self.is_complete() {
            return self
                .requested
                .iter()
                .copied()
                .zip(self.documents.iter().map(Some))
                .collect();
        }

        let by_rev: HashMap<RevisionId, &Document> = self
            .documents
            .iter()
            .filter_map(|doc| doc.revision().map(|rev| (rev, doc)))
            .collect();
        self.requested
            .iter()
            .map(|rev| (*rev, by_rev.get(rev).copied()))
            .collect()
    }

    /// Documents in server order.
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

impl<T: Transport> ReplicationClient<T> {
    /// Fetches the documents for `revisions`.
    ///
    /// `result[i]` is the document of `revisions[i]` when both have the same
    /// length. The result may be shorter than the input; that is not an error.
    /// With [`ClientConfig::documents_batch_size`](crate::ClientConfig) set,
    /// the revisions are sent in several sequential requests and the results
    /// concatenated in order.
    pub fn revision_documents(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        revisions: &[RevisionId],
    ) -> ReplicationResult<Vec<Document>> {
        if revisions.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self
            .config()
            .documents_batch_size
            .map_or(revisions.len(), |size| size.max(1));
        let mut documents = Vec::with_capacity(revisions.len());
        for batch in revisions.chunks(batch_size) {
            documents.extend(self.documents_round_trip(ctx, snapshot, batch)?);
        }

        if documents.len() < revisions.len() {
            warn!(
                collection = snapshot.collection(),
                requested = revisions.len(),
                returned = documents.len(),
                "fewer documents than revisions"
            );
        }
        info!(
            collection = snapshot.collection(),
            documents = documents.len(),
            "fetched documents"
        );
        Ok(documents)
    }

    /// Like [`revision_documents`](Self::revision_documents), keeping the
    /// requested revisions for alignment checks.
    pub fn fetch_documents(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        revisions: &[RevisionId],
    ) -> ReplicationResult<DocumentFetch> {
        let documents = self.revision_documents(ctx, snapshot, revisions)?;
        Ok(DocumentFetch {
            requested: revisions.to_vec(),
            documents,
        })
    }

    fn documents_round_trip(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        revisions: &[RevisionId],
    ) -> ReplicationResult<Vec<Document>> {
        let request = DocumentsRequest {
            snapshot,
            revisions,
        };
        let response = self.send(
            ctx,
            DocumentsRequest::ENDPOINT,
            request.query(),
            Some(request.body()),
        )?;
        response
            .parse_array()?
            .iter()
            .map(|element| element.parse_body::<Document>())
            .collect()
    }
}
