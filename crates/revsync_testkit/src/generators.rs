//! Property-based test generators using proptest.
//!
//! Ranges produced here are always well formed; list strategies keep
//! ranges ascending and disjoint, which is what range queries expect.

use proptest::prelude::*;
use revsync_protocol::{RevisionId, RevisionRange};

/// Strategy for any revision, zero included.
pub fn revision_strategy() -> impl Strategy<Value = RevisionId> {
    any::<u64>().prop_map(RevisionId::new)
}

/// Strategy for revisions that can name a document.
pub fn nonzero_revision_strategy() -> impl Strategy<Value = RevisionId> {
    (1..=u64::MAX).prop_map(RevisionId::new)
}

/// Strategy for a single well-formed range.
pub fn range_strategy() -> impl Strategy<Value = RevisionRange> {
    (any::<u64>(), any::<u64>()).prop_filter_map("range bounds", |(a, b)| {
        RevisionRange::new(RevisionId::new(a.min(b)), RevisionId::new(a.max(b))).ok()
    })
}

/// Strategy for up to `max_ranges` ascending, disjoint ranges inside
/// `[1, limit]`.
pub fn disjoint_ranges_strategy(
    limit: u64,
    max_ranges: usize,
) -> impl Strategy<Value = Vec<RevisionRange>> {
    prop::collection::btree_set(1..=limit.max(1), 0..=max_ranges * 2).prop_map(|bounds| {
        let bounds: Vec<u64> = bounds.into_iter().collect();
        bounds
            .chunks_exact(2)
            .filter_map(|pair| {
                RevisionRange::new(RevisionId::new(pair[0]), RevisionId::new(pair[1])).ok()
            })
            .collect()
    })
}

/// Strategy for a set of distinct revisions inside `[1, limit]`.
pub fn revision_set_strategy(limit: u64, max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::btree_set(1..=limit.max(1), 0..=max_len)
        .prop_map(|set| set.into_iter().collect())
}

/// Strategy for a revision page size.
pub fn page_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=64
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn nonzero_revisions_are_nonzero(revision in nonzero_revision_strategy()) {
            prop_assert!(!revision.is_zero());
        }

        #[test]
        fn ranges_are_ordered(range in range_strategy()) {
            prop_assert!(range.min() <= range.max());
        }

        #[test]
        fn disjoint_ranges_are_ascending(ranges in disjoint_ranges_strategy(500, 6)) {
            prop_assert!(ranges.len() <= 6);
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].max() < pair[1].min());
            }
            for range in &ranges {
                prop_assert!(range.min() < range.max());
                prop_assert!(range.max().get() <= 500);
            }
        }
    }
}
