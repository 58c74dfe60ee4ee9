//! Resumable walk over revision ranges.
//!
//! The ranges endpoint answers in bounded pages. Each page carries a resume
//! cursor; the walk repeats the same ranges with that cursor until the server
//! returns a zero cursor. The server alone decides when the walk is complete,
//! so there is no page limit here.
//!
//! Rows always line up with the input ranges: row `i` of the result holds
//! every revision of range `i`, in the order the server sent them.

use crate::client::ReplicationClient;
use crate::context::CallContext;
use crate::error::{ReplicationError, ReplicationResult};
use crate::transport::Transport;
use revsync_protocol::{RangesPage, RevisionId, RevisionRange, Snapshot};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Running,
    Finished,
    Aborted,
}

/// Revisions collected by a completed walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeWalk {
    rows: Vec<Vec<RevisionId>>,
    round_trips: usize,
}

impl RangeWalk {
    /// Revisions per input range, in input order.
    pub fn rows(&self) -> &[Vec<RevisionId>] {
        &self.rows
    }

    /// Number of pages fetched.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Total number of revisions.
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Returns true if no revision was found.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Returns true if every row is strictly ascending.
    ///
    /// The walker does not enforce this; servers are expected to guarantee it.
    pub fn is_ascending(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.windows(2).all(|pair| pair[0] < pair[1]))
    }

    /// Rows, one per input range.
    pub fn into_rows(self) -> Vec<Vec<RevisionId>> {
        self.rows
    }

    /// All revisions, range after range.
    pub fn into_revisions(self) -> Vec<RevisionId> {
        self.rows.into_iter().flatten().collect()
    }
}

/// Step-by-step driver of a range walk.
///
/// A failed page aborts the walker for good: the partial rows are dropped and
/// later calls fail without contacting the server.
pub struct RangeWalker<'a, T: Transport> {
    client: &'a ReplicationClient<T>,
    snapshot: &'a Snapshot,
    ranges: &'a [RevisionRange],
    rows: Vec<Vec<RevisionId>>,
    resume: RevisionId,
    round_trips: usize,
    state: WalkState,
}

impl<'a, T: Transport> RangeWalker<'a, T> {
    /// Creates a walker. Nothing is sent until the first page is requested.
    pub fn new(
        client: &'a ReplicationClient<T>,
        snapshot: &'a Snapshot,
        ranges: &'a [RevisionRange],
    ) -> Self {
        let state = if ranges.is_empty() {
            WalkState::Finished
        } else {
            WalkState::Running
        };
        Self {
            client,
            snapshot,
            ranges,
            rows: vec![Vec::new(); ranges.len()],
            resume: RevisionId::ZERO,
            round_trips: 0,
            state,
        }
    }

    /// Returns true once the server has returned a zero cursor.
    pub fn is_finished(&self) -> bool {
        self.state == WalkState::Finished
    }

    /// Cursor the next page starts from.
    pub fn resume(&self) -> RevisionId {
        self.resume
    }

    /// Pages fetched so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Revisions collected so far.
    pub fn rows(&self) -> &[Vec<RevisionId>] {
        &self.rows
    }

    /// Fetches the next page.
    ///
    /// Returns the number of revisions the page added, or `None` if the walk
    /// had already finished.
    pub fn next_page(&mut self, ctx: &CallContext) -> ReplicationResult<Option<usize>> {
        match self.state {
            WalkState::Finished => return Ok(None),
            WalkState::Aborted => {
                return Err(ReplicationError::Protocol(
                    "range walk was aborted by an earlier failure".into(),
                ))
            }
            WalkState::Running => {}
        }

        match self.fetch_page(ctx) {
            Ok(added) => Ok(Some(added)),
            Err(err) => {
                self.state = WalkState::Aborted;
                self.rows = Vec::new();
                Err(err)
            }
        }
    }

    /// Drives the walk to completion.
    pub fn run(mut self, ctx: &CallContext) -> ReplicationResult<RangeWalk> {
        while self.next_page(ctx)?.is_some() {}
        let walk = RangeWalk {
            rows: self.rows,
            round_trips: self.round_trips,
        };
        info!(
            collection = self.snapshot.collection(),
            ranges = self.ranges.len(),
            revisions = walk.len(),
            round_trips = walk.round_trips,
            "range walk complete"
        );
        Ok(walk)
    }

    fn fetch_page(&mut self, ctx: &CallContext) -> ReplicationResult<usize> {
        let page = self
            .client
            .revisions_by_ranges(ctx, self.snapshot, self.ranges, self.resume)?;
        self.round_trips += 1;
        self.validate(&page)?;

        let added = page.revision_count();
        let RangesPage { ranges, resume } = page;
        for (row, revisions) in self.rows.iter_mut().zip(ranges) {
            row.extend(revisions);
        }

        debug!(
            page = self.round_trips,
            added,
            resume = %resume,
            "range page"
        );

        self.resume = resume;
        if resume.is_zero() {
            self.state = WalkState::Finished;
        }
        Ok(added)
    }

    fn validate(&self, page: &RangesPage) -> ReplicationResult<()> {
        if page.ranges.len() > self.ranges.len() {
            return Err(ReplicationError::Decode(format!(
                "page has {} rows for {} ranges",
                page.ranges.len(),
                self.ranges.len()
            )));
        }
        if !page.resume.is_zero() && page.resume <= self.resume {
            return Err(ReplicationError::Protocol(format!(
                "resume cursor did not advance ({:?} after {:?})",
                page.resume, self.resume
            )));
        }
        Ok(())
    }
}

impl<T: Transport> ReplicationClient<T> {
    /// Creates a step-by-step walker over `ranges`.
    pub fn range_walker<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        ranges: &'a [RevisionRange],
    ) -> RangeWalker<'a, T> {
        RangeWalker::new(self, snapshot, ranges)
    }

    /// Collects every revision inside `ranges`, following resume cursors
    /// until the server reports the end.
    ///
    /// Any failed round trip aborts the walk and is returned as is; no
    /// further requests are made and nothing partial is returned.
    pub fn walk_ranges(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        ranges: &[RevisionRange],
    ) -> ReplicationResult<RangeWalk> {
        self.range_walker(snapshot, ranges).run(ctx)
    }
}
