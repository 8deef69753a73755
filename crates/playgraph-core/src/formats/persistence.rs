//! # Snapshot Format
//!
//! Binary serialization for aggregate graph state.
//!
//! Format: Header (5 bytes) + postcard-serialized aggregate.
//! - 4 bytes: Magic ("PGRF")
//! - 1 byte: Version
//!
//! ## Validation
//!
//! Loading checks the size and header before touching the payload, then
//! checks the decoded aggregate structurally:
//! - Nodes strictly ascending (no duplicates)
//! - Edges strictly ascending by canonical pair, `low < high`
//! - Both endpoints of every edge are known nodes
//! - Every weight is at least 1

use crate::aggregate::Aggregate;
use crate::sink::create_output_file;
use crate::{CanonicalPair, EdgeWeight, NodeId, PlaygraphError, primitives};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Maximum accepted snapshot size.
///
/// Checked before deserialization to bound allocation on corrupt input.
pub const MAX_SNAPSHOT_SIZE: usize = 1024 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all aggregate data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), PlaygraphError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(PlaygraphError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(PlaygraphError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PlaygraphError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PlaygraphError::Serialization(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Flat, order-preserving form of an aggregate.
#[derive(Debug, Serialize, Deserialize)]
struct SerializableAggregate {
    nodes: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId, u64)>,
}

impl From<&Aggregate> for SerializableAggregate {
    fn from(aggregate: &Aggregate) -> Self {
        Self {
            nodes: aggregate.nodes().cloned().collect(),
            edges: aggregate
                .edges()
                .map(|(pair, weight)| (pair.low().clone(), pair.high().clone(), weight.value()))
                .collect(),
        }
    }
}

impl SerializableAggregate {
    fn into_aggregate(self) -> Result<Aggregate, PlaygraphError> {
        let mut nodes = BTreeSet::new();
        for node in self.nodes {
            if nodes.last().is_some_and(|last| *last >= node) {
                return Err(PlaygraphError::Serialization(format!(
                    "node '{}' is duplicated or out of order",
                    node
                )));
            }
            nodes.insert(node);
        }

        let mut edges = BTreeMap::new();
        for (low, high, weight) in self.edges {
            if low >= high {
                return Err(PlaygraphError::Serialization(format!(
                    "edge {} -- {} is not canonical",
                    low, high
                )));
            }
            if !nodes.contains(&low) || !nodes.contains(&high) {
                return Err(PlaygraphError::Serialization(format!(
                    "edge {} -- {} references an unknown node",
                    low, high
                )));
            }
            if weight == 0 {
                return Err(PlaygraphError::Serialization(format!(
                    "edge {} -- {} has zero weight",
                    low, high
                )));
            }
            let pair = CanonicalPair::new(low, high).ok_or_else(|| {
                PlaygraphError::Serialization("self-edge in snapshot".to_string())
            })?;
            if edges.last_key_value().is_some_and(|(last, _)| *last >= pair) {
                return Err(PlaygraphError::Serialization(format!(
                    "edge {} is duplicated or out of order",
                    pair
                )));
            }
            edges.insert(pair, EdgeWeight::new(weight));
        }

        Ok(Aggregate::from_parts(nodes, edges))
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize an aggregate to bytes (header + payload).
///
/// This is a pure transformation - no file I/O. A snapshot larger than
/// `MAX_SNAPSHOT_SIZE` is rejected here, since it could never be loaded.
pub fn aggregate_to_bytes(aggregate: &Aggregate) -> Result<Vec<u8>, PlaygraphError> {
    encode_with_limit(aggregate, MAX_SNAPSHOT_SIZE)
}

fn encode_with_limit(aggregate: &Aggregate, limit: usize) -> Result<Vec<u8>, PlaygraphError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(&SerializableAggregate::from(aggregate))
        .map_err(|e| PlaygraphError::Serialization(e.to_string()))?;
    check_size(HEADER_SIZE.saturating_add(payload.len()), limit)?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

fn check_size(len: usize, limit: usize) -> Result<(), PlaygraphError> {
    if len > limit {
        return Err(PlaygraphError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            len, limit
        )));
    }
    Ok(())
}

/// Deserialize and validate an aggregate from bytes.
///
/// This is a pure transformation - no file I/O.
pub fn aggregate_from_bytes(bytes: &[u8]) -> Result<Aggregate, PlaygraphError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PlaygraphError::Serialization(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    check_size(bytes.len(), MAX_SNAPSHOT_SIZE)?;

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let serializable: SerializableAggregate = postcard::from_bytes(&bytes[HEADER_SIZE..])
        .map_err(|e| {
            PlaygraphError::Serialization(format!("Failed to deserialize aggregate: {}", e))
        })?;
    serializable.into_aggregate()
}

/// Write a snapshot file, creating missing parent directories.
pub fn write_snapshot(path: &Path, aggregate: &Aggregate) -> Result<(), PlaygraphError> {
    let bytes = aggregate_to_bytes(aggregate)?;
    let mut writer = create_output_file(path, "snapshot")?;
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| PlaygraphError::sink("snapshot", e))
}

/// Read and validate a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Aggregate, PlaygraphError> {
    let bytes = fs::read(path)
        .map_err(|e| PlaygraphError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
    aggregate_from_bytes(&bytes)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn oversized_snapshot_rejected_on_write() {
        let mut agg = Aggregate::new();
        agg.ingest(["a", "b", "c"]).unwrap();
        let full = aggregate_to_bytes(&agg).unwrap();

        assert!(encode_with_limit(&agg, full.len()).is_ok());
        assert!(matches!(
            encode_with_limit(&agg, full.len() - 1),
            Err(PlaygraphError::Serialization(_))
        ));
    }

    fn sample() -> Aggregate {
        let mut agg = Aggregate::new();
        agg.ingest(["a", "b", "c"]).expect("ingest");
        agg.ingest(["b", "c", "d"]).expect("ingest");
        agg.ingest(["lonely"]).expect("ingest");
        agg
    }

    fn encode(payload: &SerializableAggregate) -> Vec<u8> {
        let mut bytes = SnapshotHeader::new().to_bytes().to_vec();
        bytes.extend(postcard::to_stdvec(payload).expect("encode"));
        bytes
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let agg = sample();
        let bytes1 = aggregate_to_bytes(&agg).expect("serialize");
        let restored = aggregate_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = aggregate_to_bytes(&restored).expect("serialize");

        assert_eq!(restored, agg);
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            aggregate_from_bytes(&bytes),
            Err(PlaygraphError::Serialization(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = aggregate_to_bytes(&sample()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(aggregate_from_bytes(&bytes).is_err());
    }

    #[test]
    fn non_canonical_edge_rejected() {
        let payload = SerializableAggregate {
            nodes: vec!["a".into(), "b".into()],
            edges: vec![("b".into(), "a".into(), 1)],
        };
        assert!(aggregate_from_bytes(&encode(&payload)).is_err());
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let payload = SerializableAggregate {
            nodes: vec!["a".into()],
            edges: vec![("a".into(), "z".into(), 1)],
        };
        assert!(aggregate_from_bytes(&encode(&payload)).is_err());
    }

    #[test]
    fn zero_weight_and_duplicates_rejected() {
        let zero = SerializableAggregate {
            nodes: vec!["a".into(), "b".into()],
            edges: vec![("a".into(), "b".into(), 0)],
        };
        assert!(aggregate_from_bytes(&encode(&zero)).is_err());

        let dup_nodes = SerializableAggregate {
            nodes: vec!["a".into(), "a".into()],
            edges: Vec::new(),
        };
        assert!(aggregate_from_bytes(&encode(&dup_nodes)).is_err());

        let dup_edges = SerializableAggregate {
            nodes: vec!["a".into(), "b".into()],
            edges: vec![("a".into(), "b".into(), 1), ("a".into(), "b".into(), 2)],
        };
        assert!(aggregate_from_bytes(&encode(&dup_edges)).is_err());
    }

    #[test]
    fn snapshot_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snap").join("graph.pgrf");

        write_snapshot(&path, &sample()).expect("write");
        let restored = read_snapshot(&path).expect("read");

        assert_eq!(restored, sample());
    }
}
