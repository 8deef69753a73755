//! GraphML 1.0 output.
//!
//! Nodes are written before edges; the sink expects the final-emit order
//! produced by `Aggregate::emit`. Every identifier is XML-escaped.

use super::{GraphSink, SinkReport, create_output_file};
use crate::{CanonicalPair, EdgeWeight, NodeId, PlaygraphError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const SINK_NAME: &str = "graphml";

const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\"\n",
    "    xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n",
    "    xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns\n",
    "    http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">\n",
    "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"int\"/>\n",
    "  <graph id=\"G\" edgedefault=\"undirected\">\n",
);

const FOOTER: &str = "  </graph>\n</graphml>\n";

/// Escape the five reserved XML characters.
#[must_use]
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Writes a GraphML document.
pub struct GraphMlSink<W: Write> {
    writer: W,
    location: Option<PathBuf>,
    header_written: bool,
    nodes_written: u64,
    edges_written: u64,
}

impl GraphMlSink<BufWriter<File>> {
    /// Create a GraphML file at `path`, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, PlaygraphError> {
        let writer = create_output_file(path, SINK_NAME)?;
        let mut sink = Self::new(writer);
        sink.location = Some(path.to_path_buf());
        Ok(sink)
    }
}

impl<W: Write> GraphMlSink<W> {
    /// Wrap any writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            location: None,
            header_written: false,
            nodes_written: 0,
            edges_written: 0,
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), PlaygraphError> {
        if !self.header_written {
            self.write(HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), PlaygraphError> {
        self.writer
            .write_all(text.as_bytes())
            .map_err(|e| PlaygraphError::sink(SINK_NAME, e))
    }
}

impl<W: Write> GraphSink for GraphMlSink<W> {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn accept_node(&mut self, node: &NodeId) -> Result<(), PlaygraphError> {
        self.ensure_header()?;
        let line = format!("    <node id=\"{}\"/>\n", escape_xml(node.as_str()));
        self.write(&line)?;
        self.nodes_written += 1;
        Ok(())
    }

    fn accept_edge(
        &mut self,
        pair: &CanonicalPair,
        weight: EdgeWeight,
    ) -> Result<(), PlaygraphError> {
        self.ensure_header()?;
        let line = format!(
            "    <edge id=\"e{}\" source=\"{}\" target=\"{}\">\n      <data key=\"weight\">{}</data>\n    </edge>\n",
            self.edges_written,
            escape_xml(pair.low().as_str()),
            escape_xml(pair.high().as_str()),
            weight
        );
        self.write(&line)?;
        self.edges_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<SinkReport, PlaygraphError> {
        self.ensure_header()?;
        self.write(FOOTER)?;
        self.writer
            .flush()
            .map_err(|e| PlaygraphError::sink(SINK_NAME, e))?;
        Ok(SinkReport {
            sink: SINK_NAME.to_string(),
            nodes_written: self.nodes_written,
            edges_written: self.edges_written,
            location: self.location.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
