//! # Graph Sinks
//!
//! Consumers of the co-occurrence graph.
//!
//! A sink accepts nodes and weighted edges and is finalized once. There are
//! two ways to feed one:
//! - **Final**: [`Aggregate::emit`] pushes the finished aggregate, every
//!   edge carrying its full weight.
//! - **Streaming**: the pipeline replays every playlist's updates as they
//!   happen, every edge carrying an increment of 1, and calls
//!   [`GraphSink::end_file`] at each file boundary.
//!
//! [`Aggregate::emit`]: crate::aggregate::Aggregate::emit

pub mod edge_list;
pub mod graphml;

pub use edge_list::{EdgeListMode, EdgeListSink};
pub use graphml::GraphMlSink;

use crate::{CanonicalPair, EdgeWeight, NodeId, PlaygraphError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// A consumer of graph updates.
pub trait GraphSink {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Accept a node. Accepting a known node again is a no-op for sinks
    /// with merge-by-identity semantics.
    fn accept_node(&mut self, node: &NodeId) -> Result<(), PlaygraphError>;

    /// Accept an edge, or add `weight` to an existing one.
    fn accept_edge(&mut self, pair: &CanonicalPair, weight: EdgeWeight)
    -> Result<(), PlaygraphError>;

    /// Called by the pipeline after the last playlist of each file.
    fn end_file(&mut self) -> Result<(), PlaygraphError> {
        Ok(())
    }

    /// Discard anything buffered for the current file after a failure.
    fn abandon_file(&mut self) {}

    /// Whether a write failure should be logged and skipped for the rest of
    /// the current file instead of aborting the run.
    fn tolerates_failures(&self) -> bool {
        false
    }

    /// Flush everything and release the underlying storage.
    fn finalize(&mut self) -> Result<SinkReport, PlaygraphError>;
}

/// What a sink wrote over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SinkReport {
    pub sink: String,
    pub nodes_written: u64,
    pub edges_written: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

impl SinkReport {
    /// Create an empty report for `sink`.
    #[must_use]
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            ..Self::default()
        }
    }
}

/// Create (or truncate) an output file, creating missing parent directories.
pub(crate) fn create_output_file(path: &Path, sink: &str) -> Result<BufWriter<File>, PlaygraphError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PlaygraphError::sink(sink, format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    let file = File::create(path)
        .map_err(|e| PlaygraphError::sink(sink, format!("cannot create {}: {}", path.display(), e)))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_output_file_makes_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("deeper").join("out.txt");

        create_output_file(&path, "test").expect("create");

        assert!(path.exists());
    }

    #[test]
    fn report_starts_empty() {
        let report = SinkReport::new("x");
        assert_eq!(report.sink, "x");
        assert_eq!(report.nodes_written, 0);
        assert!(report.location.is_none());
    }
}
