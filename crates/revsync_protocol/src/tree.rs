//! Merkle tree summary of a collection's revisions.
//!
//! The tree is built and maintained by the remote side. Locally it is a
//! read-only value: it is fetched once per diff session, compared, and
//! dropped. Leaves are kept in the order the server sent them, which is the
//! left-to-right order of the tree's partitions.

use crate::error::{ProtocolError, ProtocolResult};
use crate::range::RevisionRange;
use revsync_codec::RevisionId;
use serde::{Deserialize, Serialize};

/// A leaf of the revision tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionTreeNode {
    hash: String,
    count: u64,
}

impl RevisionTreeNode {
    /// Creates a leaf.
    pub fn new(hash: impl Into<String>, count: u64) -> Self {
        Self {
            hash: hash.into(),
            count,
        }
    }

    /// Opaque content hash of the leaf's partition.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Number of documents in the leaf's partition.
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Merkle tree over a collection's revision space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTree {
    version: u32,
    max_depth: u32,
    range_min: RevisionId,
    range_max: RevisionId,
    #[serde(default)]
    nodes: Vec<RevisionTreeNode>,
}

impl RevisionTree {
    /// Assembles a tree from its parts. Used by servers and tests.
    pub fn from_parts(
        version: u32,
        max_depth: u32,
        range_min: RevisionId,
        range_max: RevisionId,
        nodes: Vec<RevisionTreeNode>,
    ) -> Self {
        Self {
            version,
            max_depth,
            range_min,
            range_max,
            nodes,
        }
    }

    /// Tree format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Depth of the tree.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Lowest revision covered by the tree.
    pub fn range_min(&self) -> RevisionId {
        self.range_min
    }

    /// Highest revision covered by the tree.
    pub fn range_max(&self) -> RevisionId {
        self.range_max
    }

    /// Leaves in left-to-right order.
    pub fn nodes(&self) -> &[RevisionTreeNode] {
        &self.nodes
    }

    /// The whole revision range the tree covers, as a range query input.
    pub fn range(&self) -> ProtocolResult<RevisionRange> {
        RevisionRange::new(self.range_min, self.range_max)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sum of the leaf document counts.
    pub fn document_count(&self) -> u64 {
        self.nodes.iter().map(RevisionTreeNode::count).sum()
    }

    /// Returns true if both trees partition the same space the same way.
    pub fn is_compatible_with(&self, other: &RevisionTree) -> bool {
        self.check_compatible(other).is_ok()
    }

    /// Indices of leaves whose hash or count differ.
    ///
    /// Fails if the trees have different shapes, since their leaves would
    /// then describe different partitions.
    pub fn differing_leaves(&self, other: &RevisionTree) -> ProtocolResult<Vec<usize>> {
        self.check_compatible(other)?;
        Ok(self
            .nodes
            .iter()
            .zip(&other.nodes)
            .enumerate()
            .filter(|(_, (ours, theirs))| ours != theirs)
            .map(|(index, _)| index)
            .collect())
    }

    fn check_compatible(&self, other: &RevisionTree) -> ProtocolResult<()> {
        if self.version != other.version {
            return Err(ProtocolError::incompatible(format!(
                "version {} vs {}",
                self.version, other.version
            )));
        }
        if self.max_depth != other.max_depth {
            return Err(ProtocolError::incompatible(format!(
                "max depth {} vs {}",
                self.max_depth, other.max_depth
            )));
        }
        if (self.range_min, self.range_max) != (other.range_min, other.range_max) {
            return Err(ProtocolError::incompatible("range bounds differ"));
        }
        if self.nodes.len() != other.nodes.len() {
            return Err(ProtocolError::incompatible(format!(
                "{} leaves vs {}",
                self.nodes.len(),
                other.nodes.len()
            )));
        }
        Ok(())
    }
}
