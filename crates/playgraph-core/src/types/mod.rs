//! # Core Type Definitions
//!
//! This module contains the core types for the playgraph co-occurrence engine:
//! - Node identity (`NodeId`, `NodeKind`)
//! - Edge identity and weight (`CanonicalPair`, `EdgeWeight`, `Edge`)
//! - Error types (`PlaygraphError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use checked arithmetic for counters; overflow is an error, never a wrap

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// NODE IDENTITY
// =============================================================================

/// Identifier of a node in the co-occurrence graph.
///
/// This is the raw track or artist URI taken from the input, depending on
/// the configured [`NodeKind`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for NodeId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which field of a track entry becomes the node identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// One node per distinct track URI.
    Track,
    /// One node per distinct artist URI.
    #[default]
    Artist,
}

impl NodeKind {
    /// Lowercase name, as accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeKind {
    type Err = PlaygraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "track" => Ok(Self::Track),
            "artist" => Ok(Self::Artist),
            other => Err(PlaygraphError::InvalidArgument(format!(
                "unknown node type '{}' (expected 'track' or 'artist')",
                other
            ))),
        }
    }
}

// =============================================================================
// EDGE WEIGHT
// =============================================================================

/// Weight of an undirected edge: the number of playlists in which both
/// endpoints occur.
///
/// Uses checked arithmetic. A weight that would exceed `u64::MAX` is reported
/// as [`PlaygraphError::WeightOverflow`] by the callers instead of wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EdgeWeight(pub u64);

impl EdgeWeight {
    /// The weight of a freshly observed pair.
    pub const ONE: Self = Self(1);

    /// Create a new edge weight with the given value.
    #[must_use]
    pub const fn new(weight: u64) -> Self {
        Self(weight)
    }

    /// Increment the weight by 1. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_increment(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(w) => Some(Self(w)),
            None => None,
        }
    }

    /// Add another weight. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(w) => Some(Self(w)),
            None => None,
        }
    }

    /// Get the raw weight value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CANONICAL PAIR
// =============================================================================

/// An unordered pair of distinct nodes, stored with the lexicographically
/// smaller identifier first.
///
/// `(a, b)` and `(b, a)` always produce the same `CanonicalPair`, so it is
/// the lookup key for edge weights. A node paired with itself has no
/// canonical pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    low: NodeId,
    high: NodeId,
}

impl CanonicalPair {
    /// Build the canonical pair for two identifiers.
    ///
    /// Returns `None` when both identifiers are equal (self-edges are
    /// excluded).
    #[must_use]
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Build a canonical pair from two borrowed identifiers.
    #[must_use]
    pub fn from_refs(a: &NodeId, b: &NodeId) -> Option<Self> {
        Self::new(a.clone(), b.clone())
    }

    /// The lexicographically smaller endpoint.
    #[must_use]
    pub fn low(&self) -> &NodeId {
        &self.low
    }

    /// The lexicographically larger endpoint.
    #[must_use]
    pub fn high(&self) -> &NodeId {
        &self.high
    }

    /// Check whether `node` is one of the two endpoints.
    #[must_use]
    pub fn contains(&self, node: &NodeId) -> bool {
        &self.low == node || &self.high == node
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.low, self.high)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// An aggregated edge: a canonical pair and its co-occurrence weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The canonical endpoint pair (edge identity).
    pub pair: CanonicalPair,
    /// Number of playlists containing both endpoints.
    pub weight: EdgeWeight,
}

impl Edge {
    /// Create a new edge.
    #[must_use]
    pub const fn new(pair: CanonicalPair, weight: EdgeWeight) -> Self {
        Self { pair, weight }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building a co-occurrence graph.
///
/// - No silent failures
/// - Use `Result<T, PlaygraphError>` for fallible operations
/// - The engine never panics; callers decide which errors are fatal
#[derive(Debug, Error)]
pub enum PlaygraphError {
    /// The input is not a JSON object with a decodable "playlists" array.
    #[error("Malformed input in {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },

    /// A track entry lacks the field selected by the node kind.
    #[error("Missing field '{field}' in playlist {playlist}, track {track}")]
    MissingField {
        field: String,
        playlist: usize,
        track: usize,
    },

    /// A command-line or configuration value is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A sink's underlying storage rejected a write.
    #[error("Sink '{sink}' failed to write: {reason}")]
    SinkWrite { sink: String, reason: String },

    /// An edge weight would exceed the counter range.
    #[error("Edge weight overflow on {low} -- {high}")]
    WeightOverflow { low: String, high: String },

    /// Reading an input failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PlaygraphError {
    /// Shorthand for a [`PlaygraphError::SinkWrite`].
    pub fn sink(sink: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SinkWrite {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`PlaygraphError::MalformedInput`].
    pub fn malformed(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn overflow(pair: &CanonicalPair) -> Self {
        Self::WeightOverflow {
            low: pair.low().to_string(),
            high: pair.high().to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
