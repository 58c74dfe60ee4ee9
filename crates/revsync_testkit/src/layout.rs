//! Leaf partitioning of the revision space.

use revsync_protocol::{RevisionId, RevisionRange, RevisionTree, RevisionTreeNode};
use sha2::{Digest, Sha256};

/// Tree format version served by the replica.
pub const TREE_VERSION: u32 = 1;

/// Splits `[min, max]` into `2^depth` equal leaves.
///
/// Revisions above `max` fall into the last leaf, so the last leaf's range
/// is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLayout {
    depth: u32,
    min: RevisionId,
    max: RevisionId,
}

impl TreeLayout {
    /// Creates a layout. `depth` is capped at 16 and `max` raised to `min`.
    pub fn new(depth: u32, min: RevisionId, max: RevisionId) -> Self {
        Self {
            depth: depth.min(16),
            min,
            max: max.max(min),
        }
    }

    /// Tree depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        1 << self.depth
    }

    fn span(&self) -> u128 {
        u128::from(self.max.get() - self.min.get()) + 1
    }

    /// Leaf holding `revision`.
    pub fn leaf_of(&self, revision: RevisionId) -> usize {
        let leaves = self.leaf_count();
        if revision <= self.min {
            return 0;
        }
        let offset = u128::from(revision.get() - self.min.get());
        let index = offset * leaves as u128 / self.span();
        usize::try_from(index).map_or(leaves - 1, |i| i.min(leaves - 1))
    }

    /// Revisions covered by leaf `index`.
    ///
    /// Leaf 0 starts at `min`, so revisions below `min` are not part of any
    /// range even though [`leaf_of`](Self::leaf_of) places them in leaf 0.
    pub fn leaf_range(&self, index: usize) -> RevisionRange {
        let leaves = self.leaf_count() as u128;
        let index = (index as u128).min(leaves - 1);
        let start = self.offset_to_revision(self.first_offset(index));
        let end = if index + 1 == leaves {
            RevisionId::MAX
        } else {
            self.offset_to_revision(self.first_offset(index + 1) - 1)
        };
        RevisionRange::new(start, end).unwrap_or_else(|_| RevisionRange::single(start))
    }

    /// Ranges of the given leaves, in the order given.
    pub fn leaf_ranges(&self, leaves: &[usize]) -> Vec<RevisionRange> {
        leaves.iter().map(|&leaf| self.leaf_range(leaf)).collect()
    }

    // Smallest offset whose leaf is `index`: ceil(index * span / leaves).
    fn first_offset(&self, index: u128) -> u128 {
        let leaves = self.leaf_count() as u128;
        (index * self.span()).div_ceil(leaves)
    }

    fn offset_to_revision(&self, offset: u128) -> RevisionId {
        let value = u128::from(self.min.get()) + offset;
        RevisionId::new(u64::try_from(value).unwrap_or(u64::MAX))
    }

    /// Builds the tree for an ascending sequence of revisions.
    pub fn build(&self, revisions: impl IntoIterator<Item = RevisionId>) -> RevisionTree {
        let mut hashers: Vec<Sha256> = (0..self.leaf_count()).map(|_| Sha256::new()).collect();
        let mut counts = vec![0u64; self.leaf_count()];
        for revision in revisions {
            let leaf = self.leaf_of(revision);
            hashers[leaf].update(revision.get().to_be_bytes());
            counts[leaf] += 1;
        }

        let nodes = hashers
            .into_iter()
            .zip(counts)
            .map(|(hasher, count)| RevisionTreeNode::new(hex(&hasher.finalize()), count))
            .collect();
        RevisionTree::from_parts(TREE_VERSION, self.depth, self.min, self.max, nodes)
    }
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self::new(4, RevisionId::new(1), RevisionId::new(4096))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
