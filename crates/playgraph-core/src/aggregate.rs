//! # Aggregation Engine
//!
//! Pairwise expansion of playlists into a weighted, undirected
//! co-occurrence graph.
//!
//! - Every identifier becomes a node, paired or not
//! - Every unordered pair of distinct identifiers in a playlist is one edge
//! - Each playlist adds at most 1 to the weight of any pair
//! - Weights use checked arithmetic; overflow is an error, never a wrap
//! - Nothing is ever removed from an aggregate
//!
//! All state lives in `BTreeSet`/`BTreeMap` so iteration order, and with it
//! every emitted document, is deterministic.

use crate::sink::GraphSink;
use crate::{CanonicalPair, Edge, EdgeWeight, NodeId, PlaygraphError};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PLAYLIST UPDATES
// =============================================================================

/// The node and pair updates contributed by a single playlist.
///
/// Repeated identifiers are collapsed to their first occurrence before
/// pairing, so `["a", "b", "a"]` contributes nodes `a, b` and the single
/// pair `(a, b)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistUpdates {
    nodes: Vec<NodeId>,
    pairs: Vec<CanonicalPair>,
}

impl PlaylistUpdates {
    /// Expand a playlist's identifiers into its distinct nodes and all
    /// `n * (n - 1) / 2` canonical pairs among them.
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut seen = BTreeSet::new();
        let mut nodes = Vec::new();
        for id in identifiers {
            let id: NodeId = id.into();
            if seen.insert(id.clone()) {
                nodes.push(id);
            }
        }

        let mut pairs = Vec::with_capacity(nodes.len() * nodes.len().saturating_sub(1) / 2);
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if let Some(pair) = CanonicalPair::from_refs(a, b) {
                    pairs.push(pair);
                }
            }
        }

        Self { nodes, pairs }
    }

    /// Distinct nodes, in order of first occurrence.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Canonical pairs, in positional `(i, j)` order with `i < j`.
    #[must_use]
    pub fn pairs(&self) -> &[CanonicalPair] {
        &self.pairs
    }

    /// Push these updates into a streaming sink: every node, then every
    /// pair with an increment of 1.
    pub fn replay(&self, sink: &mut dyn GraphSink) -> Result<(), PlaygraphError> {
        for node in &self.nodes {
            sink.accept_node(node)?;
        }
        for pair in &self.pairs {
            sink.accept_edge(pair, EdgeWeight::ONE)?;
        }
        Ok(())
    }
}

/// What a single `apply` changed in the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    /// Nodes seen for the first time.
    pub new_nodes: usize,
    /// Pairs created with weight 1.
    pub new_pairs: usize,
    /// Existing pairs whose weight was incremented.
    pub reinforced_pairs: usize,
}

// =============================================================================
// AGGREGATE
// =============================================================================

/// The aggregate graph state of a run: the node set plus the weight of
/// every canonical pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    nodes: BTreeSet<NodeId>,
    edges: BTreeMap<CanonicalPair, EdgeWeight>,
}

impl Aggregate {
    /// Create an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble an aggregate from already validated parts.
    pub(crate) fn from_parts(
        nodes: BTreeSet<NodeId>,
        edges: BTreeMap<CanonicalPair, EdgeWeight>,
    ) -> Self {
        Self { nodes, edges }
    }

    /// Ingest the identifiers of one playlist.
    pub fn ingest<I, S>(&mut self, identifiers: I) -> Result<IngestStats, PlaygraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.apply(&PlaylistUpdates::from_identifiers(identifiers))
    }

    /// Apply one playlist's updates.
    ///
    /// Returns `PlaygraphError::WeightOverflow` if any pair is already at
    /// the counter limit; in that case nothing is applied.
    pub fn apply(&mut self, updates: &PlaylistUpdates) -> Result<IngestStats, PlaygraphError> {
        // Pairs within one update are distinct, so checking each once is exact.
        for pair in &updates.pairs {
            if let Some(weight) = self.edges.get(pair)
                && weight.checked_increment().is_none()
            {
                return Err(PlaygraphError::overflow(pair));
            }
        }

        let mut stats = IngestStats::default();
        for node in &updates.nodes {
            if self.nodes.insert(node.clone()) {
                stats.new_nodes += 1;
            }
        }

        for pair in &updates.pairs {
            match self.edges.get_mut(pair) {
                Some(weight) => {
                    *weight = weight
                        .checked_increment()
                        .ok_or_else(|| PlaygraphError::overflow(pair))?;
                    stats.reinforced_pairs += 1;
                }
                None => {
                    self.edges.insert(pair.clone(), EdgeWeight::ONE);
                    stats.new_pairs += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Merge a partial aggregate into this one: union of nodes, sum of
    /// weights on matching pairs.
    ///
    /// The merge is associative and commutative. On overflow nothing is
    /// merged.
    pub fn merge(&mut self, other: Aggregate) -> Result<(), PlaygraphError> {
        for (pair, weight) in &other.edges {
            if let Some(existing) = self.edges.get(pair)
                && existing.checked_add(*weight).is_none()
            {
                return Err(PlaygraphError::overflow(pair));
            }
        }

        self.nodes.extend(other.nodes);
        for (pair, weight) in other.edges {
            match self.edges.get_mut(&pair) {
                Some(existing) => {
                    *existing = existing
                        .checked_add(weight)
                        .ok_or_else(|| PlaygraphError::overflow(&pair))?;
                }
                None => {
                    self.edges.insert(pair, weight);
                }
            }
        }
        Ok(())
    }

    /// Emit the finished aggregate into a sink: all nodes in identifier
    /// order, then all edges in canonical-pair order with their full weight.
    ///
    /// Does not finalize the sink.
    pub fn emit(&self, sink: &mut dyn GraphSink) -> Result<(), PlaygraphError> {
        for node in &self.nodes {
            sink.accept_node(node)?;
        }
        for (pair, weight) in &self.edges {
            sink.accept_edge(pair, *weight)?;
        }
        Ok(())
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when no node has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether `node` has been observed.
    #[must_use]
    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    /// Weight of a canonical pair.
    #[must_use]
    pub fn weight(&self, pair: &CanonicalPair) -> Option<EdgeWeight> {
        self.edges.get(pair).copied()
    }

    /// Weight between two identifiers, in either order.
    #[must_use]
    pub fn weight_between(&self, a: &str, b: &str) -> Option<EdgeWeight> {
        CanonicalPair::new(NodeId::from(a), NodeId::from(b)).and_then(|pair| self.weight(&pair))
    }

    /// All nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// All edges in canonical-pair order.
    pub fn edges(&self) -> impl Iterator<Item = (&CanonicalPair, EdgeWeight)> {
        self.edges.iter().map(|(pair, weight)| (pair, *weight))
    }

    /// All edges as owned values, in canonical-pair order.
    #[must_use]
    pub fn to_edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .map(|(pair, weight)| Edge::new(pair.clone(), *weight))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::sink::SinkReport;

    #[derive(Default)]
    struct RecordingSink {
        nodes: Vec<String>,
        edges: Vec<(String, String, u64)>,
    }

    impl GraphSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn accept_node(&mut self, node: &NodeId) -> Result<(), PlaygraphError> {
            self.nodes.push(node.to_string());
            Ok(())
        }

        fn accept_edge(
            &mut self,
            pair: &CanonicalPair,
            weight: EdgeWeight,
        ) -> Result<(), PlaygraphError> {
            self.edges
                .push((pair.low().to_string(), pair.high().to_string(), weight.value()));
            Ok(())
        }

        fn finalize(&mut self) -> Result<SinkReport, PlaygraphError> {
            Ok(SinkReport::new("recording"))
        }
    }

    #[test]
    fn distinct_playlist_yields_all_pairs() {
        let updates = PlaylistUpdates::from_identifiers(["a", "b", "c", "d"]);
        assert_eq!(updates.nodes().len(), 4);
        assert_eq!(updates.pairs().len(), 6);
    }

    #[test]
    fn duplicates_within_playlist_count_once() {
        let mut agg = Aggregate::new();
        let stats = agg.ingest(["a", "b", "a", "b"]).expect("ingest");

        assert_eq!(stats.new_nodes, 2);
        assert_eq!(stats.new_pairs, 1);
        assert_eq!(agg.weight_between("a", "b"), Some(EdgeWeight::ONE));
    }

    #[test]
    fn symmetric_ingest_hits_same_edge() {
        let mut agg = Aggregate::new();
        agg.ingest(["x", "y"]).expect("ingest");
        let stats = agg.ingest(["y", "x"]).expect("ingest");

        assert_eq!(stats.reinforced_pairs, 1);
        assert_eq!(agg.edge_count(), 1);
        assert_eq!(agg.weight_between("y", "x"), Some(EdgeWeight::new(2)));
    }

    #[test]
    fn self_pair_creates_node_only() {
        let mut agg = Aggregate::new();
        agg.ingest(["x", "x"]).expect("ingest");

        assert!(agg.contains_node(&NodeId::from("x")));
        assert_eq!(agg.edge_count(), 0);
    }

    #[test]
    fn single_track_playlist_adds_node() {
        let mut agg = Aggregate::new();
        agg.ingest(["solo"]).expect("ingest");
        assert_eq!(agg.node_count(), 1);
        assert_eq!(agg.edge_count(), 0);
    }

    #[test]
    fn overflow_leaves_aggregate_unchanged() {
        let pair = CanonicalPair::new("a".into(), "b".into()).expect("pair");
        let mut edges = BTreeMap::new();
        edges.insert(pair.clone(), EdgeWeight::new(u64::MAX));
        let nodes: BTreeSet<NodeId> = ["a", "b"].into_iter().map(NodeId::from).collect();
        let mut agg = Aggregate::from_parts(nodes, edges);
        let before = agg.clone();

        let err = agg.ingest(["c", "a", "b"]).expect_err("should overflow");

        assert!(matches!(err, PlaygraphError::WeightOverflow { .. }));
        assert_eq!(agg, before);
        assert!(!agg.contains_node(&NodeId::from("c")));
    }

    #[test]
    fn merge_sums_weights_and_unions_nodes() {
        let mut left = Aggregate::new();
        left.ingest(["a", "b"]).expect("ingest");
        let mut right = Aggregate::new();
        right.ingest(["b", "a", "c"]).expect("ingest");

        left.merge(right).expect("merge");

        assert_eq!(left.node_count(), 3);
        assert_eq!(left.weight_between("a", "b"), Some(EdgeWeight::new(2)));
        assert_eq!(left.weight_between("b", "c"), Some(EdgeWeight::ONE));
    }

    #[test]
    fn merge_overflow_is_reported() {
        let pair = CanonicalPair::new("a".into(), "b".into()).expect("pair");
        let nodes: BTreeSet<NodeId> = ["a", "b"].into_iter().map(NodeId::from).collect();
        let mut edges = BTreeMap::new();
        edges.insert(pair, EdgeWeight::new(u64::MAX));
        let mut full = Aggregate::from_parts(nodes, edges);

        let mut one = Aggregate::new();
        one.ingest(["a", "b"]).expect("ingest");

        let before = full.clone();
        assert!(matches!(
            full.merge(one),
            Err(PlaygraphError::WeightOverflow { .. })
        ));
        assert_eq!(full, before);
    }

    #[test]
    fn emit_writes_nodes_then_weighted_edges() {
        let mut agg = Aggregate::new();
        agg.ingest(["b", "a"]).expect("ingest");
        agg.ingest(["a", "b", "c"]).expect("ingest");

        let mut sink = RecordingSink::default();
        agg.emit(&mut sink).expect("emit");

        assert_eq!(sink.nodes, vec!["a", "b", "c"]);
        assert_eq!(sink.edges[0], ("a".to_string(), "b".to_string(), 2));
        assert_eq!(sink.edges.len(), 3);
    }

    #[test]
    fn replay_streams_unit_increments() {
        let updates = PlaylistUpdates::from_identifiers(["b", "a", "c"]);
        let mut sink = RecordingSink::default();
        updates.replay(&mut sink).expect("replay");

        assert_eq!(sink.nodes, vec!["b", "a", "c"]);
        assert!(sink.edges.iter().all(|(_, _, w)| *w == 1));
        assert_eq!(sink.edges[0], ("a".to_string(), "b".to_string(), 1));
    }
}
