//! Tab-separated edge-list output.
//!
//! One unordered pair per line, no header. Two modes:
//! - `Aggregated`: `low<TAB>high<TAB>weight`, once per distinct pair
//! - `PerPlaylist`: `low<TAB>high` for every pair of every playlist as it
//!   streams; weight is ignored and lines repeat across playlists

use super::{GraphSink, SinkReport, create_output_file};
use crate::{CanonicalPair, EdgeWeight, NodeId, PlaygraphError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How an [`EdgeListSink`] writes its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeListMode {
    /// One weighted line per distinct pair of the finished aggregate.
    Aggregated,
    /// One unweighted line per pair per playlist, fed as a streaming sink.
    PerPlaylist,
}

impl EdgeListMode {
    fn sink_name(self) -> &'static str {
        match self {
            Self::Aggregated => "edge-list",
            Self::PerPlaylist => "pair-list",
        }
    }
}

/// Writes edges as tab-separated lines.
pub struct EdgeListSink<W: Write> {
    writer: W,
    mode: EdgeListMode,
    location: Option<PathBuf>,
    edges_written: u64,
}

impl EdgeListSink<BufWriter<File>> {
    /// Create an edge-list file at `path`, creating parent directories.
    pub fn create(path: &Path, mode: EdgeListMode) -> Result<Self, PlaygraphError> {
        let writer = create_output_file(path, mode.sink_name())?;
        let mut sink = Self::new(writer, mode);
        sink.location = Some(path.to_path_buf());
        Ok(sink)
    }
}

impl<W: Write> EdgeListSink<W> {
    /// Wrap any writer.
    pub fn new(writer: W, mode: EdgeListMode) -> Self {
        Self {
            writer,
            mode,
            location: None,
            edges_written: 0,
        }
    }

    /// The line format of this sink.
    #[must_use]
    pub fn mode(&self) -> EdgeListMode {
        self.mode
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn check_field(&self, id: &NodeId) -> Result<(), PlaygraphError> {
        if id.as_str().contains(['\t', '\n', '\r']) {
            return Err(PlaygraphError::sink(
                self.name(),
                format!("identifier {:?} contains a tab or line break", id.as_str()),
            ));
        }
        Ok(())
    }
}

impl<W: Write> GraphSink for EdgeListSink<W> {
    fn name(&self) -> &str {
        self.mode.sink_name()
    }

    fn accept_node(&mut self, _node: &NodeId) -> Result<(), PlaygraphError> {
        // Nodes only appear as edge endpoints in this format.
        Ok(())
    }

    fn accept_edge(
        &mut self,
        pair: &CanonicalPair,
        weight: EdgeWeight,
    ) -> Result<(), PlaygraphError> {
        self.check_field(pair.low())?;
        self.check_field(pair.high())?;

        let written = match self.mode {
            EdgeListMode::Aggregated => {
                writeln!(self.writer, "{}\t{}\t{}", pair.low(), pair.high(), weight)
            }
            EdgeListMode::PerPlaylist => writeln!(self.writer, "{}\t{}", pair.low(), pair.high()),
        };
        written.map_err(|e| PlaygraphError::sink(self.mode.sink_name(), e))?;
        self.edges_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<SinkReport, PlaygraphError> {
        self.writer
            .flush()
            .map_err(|e| PlaygraphError::sink(self.mode.sink_name(), e))?;
        Ok(SinkReport {
            sink: self.name().to_string(),
            nodes_written: 0,
            edges_written: self.edges_written,
            location: self.location.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
