//! # playgraph-core
//!
//! The co-occurrence graph engine for playgraph.
//!
//! This crate turns collections of playlists into a weighted, undirected
//! graph: two tracks (or artists) are connected when they appear in the
//! same playlist, and the edge weight counts those playlists.
//!
//! ## Data Flow
//!
//! ```text
//! PlaylistSource -> IdentifierExtractor -> Aggregate -> GraphSink(s)
//!                                                    -> SummaryReport
//! ```
//!
//! ## Constraints
//!
//! - Streaming input: one playlist in memory at a time
//! - Deterministic output: `BTreeMap`/`BTreeSet` everywhere
//! - Integer arithmetic only, with checked weight counters
//! - No terminal I/O; the binary owns logging setup and progress display

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregate;
pub mod extractor;
pub mod formats;
pub mod pipeline;
pub mod primitives;
pub mod sink;
pub mod source;
pub mod storage;
pub mod summary;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CanonicalPair, Edge, EdgeWeight, NodeId, NodeKind, PlaygraphError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use aggregate::{Aggregate, IngestStats, PlaylistUpdates};
pub use extractor::IdentifierExtractor;
pub use pipeline::{
    NoopObserver, Pipeline, PipelineConfig, RunObserver, RunOutcome, RunStats, SinkFailure,
};
pub use source::{FieldNames, FileStats, Playlist, PlaylistSource, SliceRange, TrackRef};
pub use summary::{SummaryReport, WeightSummary, summarize};

// =============================================================================
// RE-EXPORTS: Sinks and Storage
// =============================================================================

pub use sink::{EdgeListMode, EdgeListSink, GraphMlSink, GraphSink, SinkReport};
pub use storage::{RedbGraphStore, StoreMode};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    SnapshotHeader, aggregate_from_bytes, aggregate_to_bytes, read_snapshot, write_snapshot,
};
