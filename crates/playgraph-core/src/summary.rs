//! # Summary Reporter
//!
//! Basic figures over the finished edge-weight distribution.
//!
//! All arithmetic is integer-only. Mean and median are carried as
//! fixed-point millionths and rounded to the nearest millionth.

use crate::aggregate::Aggregate;
use crate::primitives::MILLIONTHS;
use crate::{CanonicalPair, Edge, EdgeWeight};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;

/// Summary of a finished aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryReport {
    /// The aggregate has no edges; there is no weight distribution.
    NoEdges { node_count: usize },
    /// Figures over at least one edge.
    Weights(WeightSummary),
}

/// Weight distribution figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub min: u64,
    pub max: u64,
    pub mean_millionths: u128,
    pub median_millionths: u128,
    /// Heaviest edges: weight descending, then canonical pair ascending.
    pub top: Vec<Edge>,
}

impl WeightSummary {
    /// Mean weight rendered with six decimals.
    #[must_use]
    pub fn mean(&self) -> String {
        format_millionths(self.mean_millionths)
    }

    /// Median weight rendered with six decimals.
    #[must_use]
    pub fn median(&self) -> String {
        format_millionths(self.median_millionths)
    }
}

/// Render a fixed-point millionths value as `<int>.<6 digits>`.
#[must_use]
pub fn format_millionths(value: u128) -> String {
    let scale = u128::from(MILLIONTHS);
    format!("{}.{:06}", value / scale, value % scale)
}

/// Summarize an aggregate, listing at most `top_k` heaviest edges.
#[must_use]
pub fn summarize(aggregate: &Aggregate, top_k: usize) -> SummaryReport {
    summarize_edges(aggregate.node_count(), aggregate.edges(), top_k)
}

/// Summarize any edge collection.
pub fn summarize_edges<'a, I>(node_count: usize, edges: I, top_k: usize) -> SummaryReport
where
    I: IntoIterator<Item = (&'a CanonicalPair, EdgeWeight)>,
{
    let scale = u128::from(MILLIONTHS);
    let mut weights = Vec::new();
    let mut total: u128 = 0;
    let mut top: BTreeSet<(Reverse<EdgeWeight>, &CanonicalPair)> = BTreeSet::new();

    for (pair, weight) in edges {
        weights.push(weight.value());
        total += u128::from(weight.value());
        if top_k > 0 {
            top.insert((Reverse(weight), pair));
            if top.len() > top_k {
                top.pop_last();
            }
        }
    }

    if weights.is_empty() {
        return SummaryReport::NoEdges { node_count };
    }

    weights.sort_unstable();
    let count = weights.len() as u128;
    let mid = weights.len() / 2;
    let median_millionths = if weights.len() % 2 == 1 {
        u128::from(weights[mid]) * scale
    } else {
        (u128::from(weights[mid - 1]) + u128::from(weights[mid])) * scale / 2
    };
    let mean_millionths = (total * scale * 2 + count) / (count * 2);

    SummaryReport::Weights(WeightSummary {
        node_count,
        edge_count: weights.len(),
        min: weights[0],
        max: weights[weights.len() - 1],
        mean_millionths,
        median_millionths,
        top: top
            .into_iter()
            .map(|(Reverse(weight), pair)| Edge::new(pair.clone(), weight))
            .collect(),
    })
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEdges { node_count } => {
                writeln!(f, "Nodes: {}", node_count)?;
                writeln!(f, "Edges: 0")?;
                write!(f, "No edges: weight statistics are not available")
            }
            Self::Weights(summary) => {
                writeln!(f, "Nodes: {}", summary.node_count)?;
                writeln!(f, "Edges: {}", summary.edge_count)?;
                writeln!(f, "Min weight: {}", summary.min)?;
                writeln!(f, "Max weight: {}", summary.max)?;
                writeln!(f, "Mean weight: {}", summary.mean())?;
                write!(f, "Median weight: {}", summary.median())?;
                if !summary.top.is_empty() {
                    write!(f, "\nTop {} edges:", summary.top.len())?;
                    for (rank, edge) in summary.top.iter().enumerate() {
                        write!(f, "\n  {:>3}. {} ({})", rank + 1, edge.pair, edge.weight)?;
                    }
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
