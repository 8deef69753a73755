//! # playgraph
//!
//! Command-line front end for `playgraph-core`: flag parsing, layered
//! configuration and progress display. The binary in `main.rs` only sets
//! up logging and maps errors to exit codes.

pub mod cli;
pub mod config;
pub mod progress;
