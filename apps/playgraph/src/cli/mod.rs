//! # Playgraph CLI Module
//!
//! This module implements the command-line interface for playgraph.
//!
//! A single invocation selects a range of playlist files from a directory,
//! builds the co-occurrence graph, writes it in the chosen format and
//! prints a summary of the weight distribution.

mod commands;

use crate::config::Settings;
use clap::{CommandFactory, Parser, ValueEnum};
use playgraph_core::{NodeKind, PlaygraphError};
use std::ffi::OsString;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Playgraph - playlist co-occurrence graph builder
///
/// Connects tracks (or artists) that appear in the same playlist. Edge
/// weights count the playlists two nodes share.
#[derive(Parser, Debug)]
#[command(name = "playgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory scanned for *.json playlist files (default: config data_dir)
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// First file index to process, inclusive
    #[arg(short, long, default_value_t = playgraph_core::primitives::DEFAULT_START_INDEX)]
    pub start: usize,

    /// Last file index to process, inclusive (default: 1)
    #[arg(short, long)]
    pub end: Option<usize>,

    /// Output path (default: <type>_graph.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Node identity: "track" or "artist"
    #[arg(short = 't', long = "type", default_value = "artist")]
    pub node_type: NodeKind,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Graphml)]
    pub format: OutputFormat,

    /// Keep existing contents of a redb store instead of rebuilding it
    #[arg(long)]
    pub append: bool,

    /// Upserts per redb transaction (default: 1000)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Parallel file workers (default: 1)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip playlists with missing identifier fields instead of aborting
    #[arg(long)]
    pub lenient: bool,

    /// Number of heaviest edges to report (default: 10)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// TOML config file (default: ./playgraph.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Output the run report in JSON format (for programmatic access)
    #[arg(long)]
    pub json_mode: bool,
}

/// Graph output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// GraphML 1.0 document
    Graphml,
    /// Tab-separated `low high weight`, one line per pair
    EdgeList,
    /// Tab-separated `low high`, one line per pair of every playlist
    PairList,
    /// Embedded redb graph store
    Redb,
    /// Binary aggregate snapshot
    Snapshot,
}

impl OutputFormat {
    /// File extension used for the default output path.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Graphml => "graphml",
            Self::EdgeList | Self::PairList => "txt",
            Self::Redb => "redb",
            Self::Snapshot => "pgrf",
        }
    }

    /// Whether the format receives updates while files are read.
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::PairList | Self::Redb)
    }
}

/// `<type>_graph.<ext>` in the working directory.
pub fn default_output(kind: NodeKind, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("{}_graph.{}", kind.name(), format.extension()))
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), PlaygraphError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let options = BuildOptions::resolve(&cli, &settings)?;
    let report = cmd_build(&options)?;
    print_report(&report, cli.json_mode)
}

// =============================================================================
// EXIT CODES
// =============================================================================

/// Process exit status for a successful run, `--help` or `--version`.
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status for any parse or run failure.
pub const EXIT_FAILURE: u8 = 1;

/// Parse command-line arguments.
///
/// On failure the clap message is printed (help and version to stdout,
/// errors with usage to stderr) and the exit status is returned instead.
pub fn parse_args<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            EXIT_FAILURE
        } else {
            EXIT_SUCCESS
        }
    })
}

/// Map a run result to the process exit status, logging any error.
///
/// `InvalidArgument` also reprints usage to stderr.
pub fn exit_code(result: Result<(), PlaygraphError>) -> u8 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("Error: {}", e);
            if matches!(e, PlaygraphError::InvalidArgument(_)) {
                eprintln!("{}", Cli::command().render_usage());
            }
            EXIT_FAILURE
        }
    }
}
