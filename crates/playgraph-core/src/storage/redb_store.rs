//! # redb-backed Graph Store
//!
//! The graph-database sink: an embedded redb database holding the node set
//! and the weight of every canonical pair.
//!
//! - Upserts are merge-by-identity: a node is created if absent and never
//!   duplicated; an edge increment adds to the stored weight
//! - Updates are buffered and committed in one write transaction per
//!   `batch_size` operations and at every file boundary
//! - In `StoreMode::Rebuild` both tables are dropped once, when the store is
//!   opened, before any write of the run

use crate::sink::{GraphSink, SinkReport};
use crate::{CanonicalPair, Edge, EdgeWeight, NodeId, PlaygraphError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SINK_NAME: &str = "redb";

/// Table for nodes: identifier -> ()
const NODES: TableDefinition<&str, ()> = TableDefinition::new("nodes");

/// Table for edges: (low, high) -> weight
const EDGES: TableDefinition<(&str, &str), u64> = TableDefinition::new("edges");

fn store_error(e: impl std::fmt::Display) -> PlaygraphError {
    PlaygraphError::sink(SINK_NAME, e)
}

/// What to do with a store's existing contents when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    /// Drop all nodes and edges before the run.
    #[default]
    Rebuild,
    /// Keep existing contents and merge into them.
    Append,
}

/// A batched, disk-backed co-occurrence graph.
pub struct RedbGraphStore {
    db: Database,
    path: PathBuf,
    batch_size: usize,
    pending_nodes: BTreeSet<NodeId>,
    pending_edges: BTreeMap<CanonicalPair, EdgeWeight>,
    pending_ops: usize,
    batches_committed: u64,
    nodes_written: u64,
    edges_written: u64,
}

impl std::fmt::Debug for RedbGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraphStore")
            .field("path", &self.path)
            .field("batch_size", &self.batch_size)
            .field("pending_ops", &self.pending_ops)
            .finish_non_exhaustive()
    }
}

impl RedbGraphStore {
    /// Open or create a store at `path`.
    ///
    /// Returns `PlaygraphError::InvalidArgument` for a zero batch size.
    pub fn open(
        path: impl AsRef<Path>,
        mode: StoreMode,
        batch_size: usize,
    ) -> Result<Self, PlaygraphError> {
        if batch_size == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(store_error)?;
        }

        let db = Database::create(&path).map_err(store_error)?;

        {
            let write_txn = db.begin_write().map_err(store_error)?;
            if mode == StoreMode::Rebuild {
                write_txn.delete_table(NODES).map_err(store_error)?;
                write_txn.delete_table(EDGES).map_err(store_error)?;
            }
            let _ = write_txn.open_table(NODES).map_err(store_error)?;
            let _ = write_txn.open_table(EDGES).map_err(store_error)?;
            write_txn.commit().map_err(store_error)?;
        }

        info!(path = %path.display(), ?mode, batch_size, "opened graph store");

        Ok(Self {
            db,
            path,
            batch_size,
            pending_nodes: BTreeSet::new(),
            pending_edges: BTreeMap::new(),
            pending_ops: 0,
            batches_committed: 0,
            nodes_written: 0,
            edges_written: 0,
        })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of buffered upserts not yet committed.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.pending_ops
    }

    /// Number of write transactions committed so far.
    #[must_use]
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    /// Commit all buffered upserts in one write transaction.
    ///
    /// The buffer is cleared whether or not the commit succeeds.
    pub fn flush(&mut self) -> Result<(), PlaygraphError> {
        if self.pending_ops == 0 {
            return Ok(());
        }

        let nodes = std::mem::take(&mut self.pending_nodes);
        let edges = std::mem::take(&mut self.pending_edges);
        let ops = std::mem::take(&mut self.pending_ops);

        let write_txn = self.db.begin_write().map_err(store_error)?;
        {
            let mut nodes_table = write_txn.open_table(NODES).map_err(store_error)?;
            for node in &nodes {
                nodes_table.insert(node.as_str(), ()).map_err(store_error)?;
            }

            let mut edges_table = write_txn.open_table(EDGES).map_err(store_error)?;
            for (pair, weight) in &edges {
                let key = (pair.low().as_str(), pair.high().as_str());
                let current = edges_table
                    .get(key)
                    .map_err(store_error)?
                    .map(|v| v.value())
                    .unwrap_or(0);
                let updated = current
                    .checked_add(weight.value())
                    .ok_or_else(|| PlaygraphError::overflow(pair))?;
                edges_table.insert(key, updated).map_err(store_error)?;
            }
        }
        write_txn.commit().map_err(store_error)?;

        self.batches_committed += 1;
        self.nodes_written += nodes.len() as u64;
        self.edges_written += edges.len() as u64;
        debug!(
            batch = self.batches_committed,
            ops,
            nodes = nodes.len(),
            edges = edges.len(),
            "committed store batch"
        );
        Ok(())
    }

    fn record_op(&mut self) -> Result<(), PlaygraphError> {
        self.pending_ops += 1;
        if self.pending_ops >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of committed nodes.
    pub fn node_count(&self) -> Result<usize, PlaygraphError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(NODES).map_err(store_error)?;
        let count = table.len().map_err(store_error)?;
        Ok(count as usize)
    }

    /// Number of committed edges.
    pub fn edge_count(&self) -> Result<usize, PlaygraphError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(EDGES).map_err(store_error)?;
        let count = table.len().map_err(store_error)?;
        Ok(count as usize)
    }

    /// Committed weight of a canonical pair.
    pub fn weight(&self, pair: &CanonicalPair) -> Result<Option<EdgeWeight>, PlaygraphError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(EDGES).map_err(store_error)?;
        let weight = table
            .get((pair.low().as_str(), pair.high().as_str()))
            .map_err(store_error)?
            .map(|v| EdgeWeight::new(v.value()));
        Ok(weight)
    }

    /// All committed nodes in identifier order.
    pub fn nodes(&self) -> Result<Vec<NodeId>, PlaygraphError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(NODES).map_err(store_error)?;

        let mut nodes = Vec::new();
        for entry in table.iter().map_err(store_error)? {
            let (key, _) = entry.map_err(store_error)?;
            nodes.push(NodeId::from(key.value()));
        }
        Ok(nodes)
    }

    /// All committed edges in canonical-pair order.
    pub fn edges(&self) -> Result<Vec<Edge>, PlaygraphError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(EDGES).map_err(store_error)?;

        let mut edges = Vec::new();
        for entry in table.iter().map_err(store_error)? {
            let (key, value) = entry.map_err(store_error)?;
            let (low, high) = key.value();
            let pair = CanonicalPair::new(NodeId::from(low), NodeId::from(high)).ok_or_else(|| {
                store_error(format!("stored self-edge on {}", low))
            })?;
            edges.push(Edge::new(pair, EdgeWeight::new(value.value())));
        }
        Ok(edges)
    }
}

impl GraphSink for RedbGraphStore {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn accept_node(&mut self, node: &NodeId) -> Result<(), PlaygraphError> {
        self.pending_nodes.insert(node.clone());
        self.record_op()
    }

    fn accept_edge(
        &mut self,
        pair: &CanonicalPair,
        weight: EdgeWeight,
    ) -> Result<(), PlaygraphError> {
        let entry = self.pending_edges.entry(pair.clone()).or_default();
        *entry = entry
            .checked_add(weight)
            .ok_or_else(|| PlaygraphError::overflow(pair))?;
        self.record_op()
    }

    fn end_file(&mut self) -> Result<(), PlaygraphError> {
        self.flush()
    }

    fn abandon_file(&mut self) {
        if self.pending_ops > 0 {
            debug!(ops = self.pending_ops, "discarding uncommitted store batch");
        }
        self.pending_nodes.clear();
        self.pending_edges.clear();
        self.pending_ops = 0;
    }

    fn tolerates_failures(&self) -> bool {
        true
    }

    fn finalize(&mut self) -> Result<SinkReport, PlaygraphError> {
        self.flush()?;
        info!(
            path = %self.path.display(),
            batches = self.batches_committed,
            "graph store finalized"
        );
        Ok(SinkReport {
            sink: SINK_NAME.to_string(),
            nodes_written: self.nodes_written,
            edges_written: self.edges_written,
            location: Some(self.path.clone()),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
