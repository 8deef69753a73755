//! # Property-Based Tests
//!
//! Determinism and merge invariants of the aggregation engine, checked
//! with proptest.

use playgraph_core::{
    Aggregate, CanonicalPair, EdgeWeight, NodeId, PlaylistUpdates, aggregate_from_bytes,
    aggregate_to_bytes,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Small alphabet so playlists overlap and weights grow past 1.
fn identifier() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f", "g", "h"]).prop_map(String::from)
}

fn playlist() -> impl Strategy<Value = Vec<String>> {
    vec(identifier(), 0..8)
}

fn playlists() -> impl Strategy<Value = Vec<Vec<String>>> {
    vec(playlist(), 0..12)
}

fn aggregate_of(lists: &[Vec<String>]) -> Aggregate {
    let mut agg = Aggregate::new();
    for list in lists {
        agg.ingest(list.iter().cloned()).expect("ingest");
    }
    agg
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Same playlists in the same order produce identical aggregates.
    #[test]
    fn determinism_identical_input_produces_identical_output(lists in playlists()) {
        prop_assert_eq!(aggregate_of(&lists), aggregate_of(&lists));
    }

    /// A playlist of n distinct identifiers contributes n(n-1)/2 pairs.
    #[test]
    fn distinct_playlist_pair_count(list in playlist()) {
        let distinct: BTreeSet<&String> = list.iter().collect();
        let n = distinct.len();
        let updates = PlaylistUpdates::from_identifiers(list.iter().cloned());

        prop_assert_eq!(updates.nodes().len(), n);
        prop_assert_eq!(updates.pairs().len(), n * n.saturating_sub(1) / 2);
    }

    /// Edge weight equals the number of playlists containing both endpoints.
    #[test]
    fn weight_counts_playlists(lists in playlists()) {
        let agg = aggregate_of(&lists);

        for (pair, weight) in agg.edges() {
            let expected = lists
                .iter()
                .filter(|list| {
                    list.iter().any(|id| id == pair.low().as_str())
                        && list.iter().any(|id| id == pair.high().as_str())
                })
                .count() as u64;
            prop_assert_eq!(weight, EdgeWeight::new(expected));
        }
    }

    /// Reversing a playlist never changes the aggregate.
    #[test]
    fn pair_identity_is_symmetric(lists in playlists()) {
        let reversed: Vec<Vec<String>> = lists
            .iter()
            .map(|list| list.iter().rev().cloned().collect())
            .collect();
        prop_assert_eq!(aggregate_of(&lists), aggregate_of(&reversed));
    }

    /// Every stored pair is canonical and never a self-pair.
    #[test]
    fn pairs_are_canonical(lists in playlists()) {
        let agg = aggregate_of(&lists);
        for (pair, _) in agg.edges() {
            prop_assert!(pair.low() < pair.high());
            prop_assert!(agg.contains_node(pair.low()));
            prop_assert!(agg.contains_node(pair.high()));
        }
    }

    /// Merging partial aggregates equals sequential processing, for any
    /// split point.
    #[test]
    fn merge_matches_sequential(lists in playlists(), split in 0usize..12) {
        let split = split.min(lists.len());
        let (left, right) = lists.split_at(split);

        let mut merged = aggregate_of(left);
        merged.merge(aggregate_of(right)).expect("merge");

        prop_assert_eq!(merged, aggregate_of(&lists));
    }

    /// Merge is commutative.
    #[test]
    fn merge_commutative(a in playlists(), b in playlists()) {
        let mut ab = aggregate_of(&a);
        ab.merge(aggregate_of(&b)).expect("merge");
        let mut ba = aggregate_of(&b);
        ba.merge(aggregate_of(&a)).expect("merge");

        prop_assert_eq!(ab, ba);
    }

    /// Merge is associative.
    #[test]
    fn merge_associative(a in playlists(), b in playlists(), c in playlists()) {
        let mut left = aggregate_of(&a);
        left.merge(aggregate_of(&b)).expect("merge");
        left.merge(aggregate_of(&c)).expect("merge");

        let mut bc = aggregate_of(&b);
        bc.merge(aggregate_of(&c)).expect("merge");
        let mut right = aggregate_of(&a);
        right.merge(bc).expect("merge");

        prop_assert_eq!(left, right);
    }

    /// Snapshots restore the identical aggregate.
    #[test]
    fn snapshot_restores_aggregate(lists in playlists()) {
        let agg = aggregate_of(&lists);
        let bytes = aggregate_to_bytes(&agg).expect("serialize");
        prop_assert_eq!(aggregate_from_bytes(&bytes).expect("deserialize"), agg);
    }

    /// Canonical pairs do not depend on argument order.
    #[test]
    fn canonical_pair_order_independent(a in identifier(), b in identifier()) {
        let ab = CanonicalPair::new(NodeId::from(a.as_str()), NodeId::from(b.as_str()));
        let ba = CanonicalPair::new(NodeId::from(b.as_str()), NodeId::from(a.as_str()));

        prop_assert_eq!(&ab, &ba);
        prop_assert_eq!(ab.is_none(), a == b);
    }
}
