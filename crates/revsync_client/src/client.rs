//! Replication client and single round trip calls.

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::ReplicationResult;
use crate::transport::{Request, Response, Transport, STATUS_OK};
use revsync_protocol::{
    Endpoint, RangesPage, RangesRequest, RevisionId, RevisionRange, RevisionTree, Snapshot,
    TreeRequest,
};
use serde::Serialize;
use tracing::debug;

/// Client for the revision replication endpoints of one database.
///
/// Holds no mutable state; every call is an independent sequence of round
/// trips and may run concurrently with others on the same client.
pub struct ReplicationClient<T: Transport> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> ReplicationClient<T> {
    /// Creates a client.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the revision tree of a snapshot.
    ///
    /// One request, no retry and no caching.
    pub fn revision_tree(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
    ) -> ReplicationResult<RevisionTree> {
        let request = TreeRequest { snapshot };
        let response = self.send(ctx, TreeRequest::ENDPOINT, request.query(), None::<&()>)?;
        let tree: RevisionTree = response.parse_body()?;
        debug!(
            collection = snapshot.collection(),
            version = tree.version(),
            max_depth = tree.max_depth(),
            leaves = tree.leaf_count(),
            "fetched revision tree"
        );
        Ok(tree)
    }

    /// Fetches one page of revisions inside `ranges`, starting at `resume`.
    ///
    /// Most callers want [`walk_ranges`](Self::walk_ranges), which follows the
    /// resume cursor to the end.
    pub fn revisions_by_ranges(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        ranges: &[RevisionRange],
        resume: RevisionId,
    ) -> ReplicationResult<RangesPage> {
        let request = RangesRequest {
            snapshot,
            ranges,
            resume,
        };
        let response = self.send(
            ctx,
            RangesRequest::ENDPOINT,
            request.query(),
            Some(request.body()),
        )?;
        response.parse_body()
    }

    /// Issues one request and checks its status.
    pub(crate) fn send<B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        endpoint: Endpoint,
        query: Vec<(&'static str, String)>,
        body: Option<&B>,
    ) -> ReplicationResult<Response> {
        let ctx = match self.config.request_timeout {
            Some(timeout) => ctx.bounded(timeout),
            None => ctx.clone(),
        };
        ctx.check()?;

        let mut request = Request::new(endpoint.method(), endpoint.path(&self.config.database))
            .with_format(self.config.wire_format);
        for (name, value) in query {
            request = request.with_query(name, value);
        }
        if let Some(body) = body {
            request = request.with_body(body)?;
        }

        let response = self.transport.request(&ctx, request)?;
        ctx.check()?;
        debug!(
            endpoint = endpoint.name(),
            status = response.status(),
            bytes = response.body().len(),
            "round trip"
        );
        response.check_status(STATUS_OK)?;
        Ok(response)
    }
}
