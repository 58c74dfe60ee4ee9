//! Revision ranges and range query pages.

use crate::error::{ProtocolError, ProtocolResult};
use revsync_codec::RevisionId;
use serde::{Deserialize, Serialize};

/// An inclusive range of revisions, `min <= max`.
///
/// Written on the wire as a two-element array `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "(RevisionId, RevisionId)",
    into = "(RevisionId, RevisionId)"
)]
pub struct RevisionRange {
    min: RevisionId,
    max: RevisionId,
}

impl RevisionRange {
    /// Creates a range, rejecting reversed bounds.
    pub fn new(min: RevisionId, max: RevisionId) -> ProtocolResult<Self> {
        if min > max {
            return Err(ProtocolError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// A range holding a single revision.
    pub fn single(revision: RevisionId) -> Self {
        Self {
            min: revision,
            max: revision,
        }
    }

    /// Lower bound.
    pub fn min(&self) -> RevisionId {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> RevisionId {
        self.max
    }

    /// Returns true if `revision` lies inside the range.
    pub fn contains(&self, revision: RevisionId) -> bool {
        self.min <= revision && revision <= self.max
    }
}

impl TryFrom<(RevisionId, RevisionId)> for RevisionRange {
    type Error = ProtocolError;

    fn try_from((min, max): (RevisionId, RevisionId)) -> ProtocolResult<Self> {
        Self::new(min, max)
    }
}

impl From<RevisionRange> for (RevisionId, RevisionId) {
    fn from(range: RevisionRange) -> Self {
        (range.min, range.max)
    }
}

/// One page of a range query.
///
/// `ranges[i]` holds the revisions found in input range `i` for this page.
/// A zero `resume` marks the last page; otherwise it is where the next page
/// starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangesPage {
    /// Revisions per input range, in input order.
    #[serde(default)]
    pub ranges: Vec<Vec<RevisionId>>,
    /// Resume cursor; zero when exhausted.
    #[serde(default)]
    pub resume: RevisionId,
}

impl RangesPage {
    /// Creates a page.
    pub fn new(ranges: Vec<Vec<RevisionId>>, resume: RevisionId) -> Self {
        Self { ranges, resume }
    }

    /// Returns true if no further pages follow.
    pub fn is_last(&self) -> bool {
        self.resume.is_zero()
    }

    /// Total number of revisions on this page.
    pub fn revision_count(&self) -> usize {
        self.ranges.iter().map(Vec::len).sum()
    }
}
