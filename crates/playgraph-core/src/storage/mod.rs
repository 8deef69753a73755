//! # Storage
//!
//! Persistent graph-database sink backed by redb.

pub mod redb_store;

pub use redb_store::{RedbGraphStore, StoreMode};
