//! # Formats
//!
//! Serialization of engine state.

pub mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_SIZE, SnapshotHeader, aggregate_from_bytes, aggregate_to_bytes, read_snapshot,
    write_snapshot,
};
