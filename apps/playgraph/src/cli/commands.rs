//! # CLI Command Implementations
//!
//! Input selection, sink construction and report printing for a build run.

use super::{Cli, OutputFormat, default_output};
use crate::config::Settings;
use crate::progress::{ProgressReporter, ProgressTotal};
use playgraph_core::primitives::DEFAULT_END_INDEX;
use playgraph_core::{
    Aggregate, EdgeListMode, EdgeListSink, GraphMlSink, GraphSink, NodeKind, Pipeline,
    PipelineConfig, PlaygraphError, RedbGraphStore, RunOutcome, RunStats, SinkReport, StoreMode,
    SummaryReport, summarize, write_snapshot,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// =============================================================================
// INPUT SELECTION
// =============================================================================

/// List the `*.json` files directly inside `dir`, sorted by path.
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>, PlaygraphError> {
    if !dir.is_dir() {
        return Err(PlaygraphError::InvalidArgument(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        PlaygraphError::InvalidArgument(format!("Cannot read directory '{}': {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| {
                PlaygraphError::InvalidArgument(format!(
                    "Cannot read directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Select the inclusive index range `start..=end` of `files`.
///
/// Without an explicit `end` the range covers the first two files, clamped
/// to the list. An explicit `end` past the last file is an error.
pub fn select_range(
    files: &[PathBuf],
    start: usize,
    end: Option<usize>,
) -> Result<&[PathBuf], PlaygraphError> {
    let Some(last) = files.len().checked_sub(1) else {
        return Err(PlaygraphError::InvalidArgument(
            "no *.json input files found".to_string(),
        ));
    };

    let end = match end {
        Some(end) if end > last => {
            return Err(PlaygraphError::InvalidArgument(format!(
                "end index {} is out of range (last file index is {})",
                end, last
            )));
        }
        Some(end) => end,
        None => DEFAULT_END_INDEX.min(last),
    };

    if start > end {
        return Err(PlaygraphError::InvalidArgument(format!(
            "start index {} is greater than end index {}",
            start, end
        )));
    }

    Ok(&files[start..=end])
}

// =============================================================================
// BUILD OPTIONS
// =============================================================================

/// Fully resolved settings for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub directory: PathBuf,
    pub start: usize,
    pub end: Option<usize>,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub store_mode: StoreMode,
    pub batch_size: usize,
    pub pipeline: PipelineConfig,
    pub top_k: usize,
    pub quiet: bool,
}

impl BuildOptions {
    /// Combine command-line flags with loaded settings. Flags win.
    pub fn resolve(cli: &Cli, settings: &Settings) -> Result<Self, PlaygraphError> {
        let batch_size = cli.batch_size.unwrap_or(settings.batch_size);
        if batch_size == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let jobs = cli.jobs.unwrap_or(settings.jobs);
        if jobs == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "jobs must be at least 1".to_string(),
            ));
        }

        if cli.append && cli.format != OutputFormat::Redb {
            warn!("--append only applies to the redb format; ignoring it");
        }

        Ok(Self {
            directory: cli
                .directory
                .clone()
                .unwrap_or_else(|| settings.data_dir.clone()),
            start: cli.start,
            end: cli.end,
            output: cli
                .output
                .clone()
                .unwrap_or_else(|| default_output(cli.node_type, cli.format)),
            format: cli.format,
            store_mode: if cli.append {
                StoreMode::Append
            } else {
                StoreMode::Rebuild
            },
            batch_size,
            pipeline: PipelineConfig {
                node_kind: cli.node_type,
                fields: settings.fields(),
                strict: settings.strict && !cli.lenient,
                jobs,
            },
            top_k: cli.top_k.unwrap_or(settings.top_k),
            quiet: cli.quiet,
        })
    }
}

// =============================================================================
// BUILD COMMAND
// =============================================================================

/// Everything a finished build reports.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub node_kind: NodeKind,
    pub files: Vec<PathBuf>,
    pub output: SinkReport,
    pub stats: RunStats,
    pub node_count: usize,
    pub edge_count: usize,
    pub summary: SummaryReport,
}

/// Build the graph for the selected files and write it out.
pub fn cmd_build(options: &BuildOptions) -> Result<BuildReport, PlaygraphError> {
    let files = discover_input_files(&options.directory)?;
    let selected = select_range(&files, options.start, options.end)?;
    info!(
        directory = %options.directory.display(),
        start = options.start,
        files = selected.len(),
        format = ?options.format,
        streaming = options.format.is_streaming(),
        output = %options.output.display(),
        "selected input files"
    );

    let progress = ProgressReporter::new(progress_total(selected, options.quiet), options.quiet);
    let pipeline = Pipeline::new(options.pipeline.clone())?.with_observer(&progress);

    let (outcome, output) = match options.format {
        OutputFormat::Graphml => {
            let outcome = pipeline.run(selected, &mut [])?;
            let report = write_final(&outcome.aggregate, GraphMlSink::create(&options.output)?)?;
            (outcome, report)
        }
        OutputFormat::EdgeList => {
            let outcome = pipeline.run(selected, &mut [])?;
            let sink = EdgeListSink::create(&options.output, EdgeListMode::Aggregated)?;
            let report = write_final(&outcome.aggregate, sink)?;
            (outcome, report)
        }
        OutputFormat::PairList => {
            let sink = EdgeListSink::create(&options.output, EdgeListMode::PerPlaylist)?;
            run_streaming(&pipeline, selected, sink)?
        }
        OutputFormat::Redb => {
            let store =
                RedbGraphStore::open(&options.output, options.store_mode, options.batch_size)?;
            run_streaming(&pipeline, selected, store)?
        }
        OutputFormat::Snapshot => {
            let outcome = pipeline.run(selected, &mut [])?;
            write_snapshot(&options.output, &outcome.aggregate)?;
            let report = SinkReport {
                nodes_written: outcome.aggregate.node_count() as u64,
                edges_written: outcome.aggregate.edge_count() as u64,
                location: Some(options.output.clone()),
                ..SinkReport::new("snapshot")
            };
            (outcome, report)
        }
    };
    progress.finish();

    Ok(BuildReport {
        node_kind: options.pipeline.node_kind,
        files: selected.to_vec(),
        node_count: outcome.aggregate.node_count(),
        edge_count: outcome.aggregate.edge_count(),
        summary: summarize(&outcome.aggregate, options.top_k),
        output,
        stats: outcome.stats,
    })
}

/// Size the progress bar. A hidden bar is never drawn, so the slice
/// pre-scan is skipped and files are counted instead.
pub fn progress_total(files: &[PathBuf], quiet: bool) -> ProgressTotal {
    if quiet {
        ProgressTotal::Files(files.len() as u64)
    } else {
        ProgressTotal::for_files(files)
    }
}

/// Feed a finished aggregate to a file sink.
fn write_final<S: GraphSink>(
    aggregate: &Aggregate,
    mut sink: S,
) -> Result<SinkReport, PlaygraphError> {
    aggregate.emit(&mut sink)?;
    sink.finalize()
}

/// Run with `sink` receiving updates as files are read.
fn run_streaming<S: GraphSink>(
    pipeline: &Pipeline<'_>,
    files: &[PathBuf],
    mut sink: S,
) -> Result<(RunOutcome, SinkReport), PlaygraphError> {
    let outcome = pipeline.run(files, &mut [&mut sink])?;
    let report = sink.finalize()?;
    Ok((outcome, report))
}

// =============================================================================
// REPORT
// =============================================================================

/// Print the build report to stdout.
pub fn print_report(report: &BuildReport, json_mode: bool) -> Result<(), PlaygraphError> {
    if json_mode {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| PlaygraphError::Serialization(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Playgraph Build Report");
    println!("======================");
    println!("Node type:  {}", report.node_kind);
    println!("Files:      {}", report.stats.files_processed);
    println!("Playlists:  {}", report.stats.playlists);
    println!("Tracks:     {}", report.stats.tracks);
    if report.stats.skipped_playlists > 0 {
        println!("Skipped:    {} playlists", report.stats.skipped_playlists);
    }
    if !report.stats.sink_failures.is_empty() {
        println!("Sink failures tolerated: {}", report.stats.sink_failures.len());
    }
    match &report.output.location {
        Some(path) => println!("Output:     {} ({})", path.display(), report.output.sink),
        None => println!("Output:     {}", report.output.sink),
    }
    println!();
    println!("{}", report.summary);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn default_range_is_first_two_files() {
        let files = paths(&["a.json", "b.json", "c.json"]);
        assert_eq!(select_range(&files, 0, None).unwrap(), &files[0..2]);
    }

    #[test]
    fn default_end_clamped_for_single_file() {
        let files = paths(&["a.json"]);
        assert_eq!(select_range(&files, 0, None).unwrap(), &files[..]);
    }

    #[test]
    fn explicit_end_out_of_range_rejected() {
        let files = paths(&["a.json", "b.json"]);
        assert!(matches!(
            select_range(&files, 0, Some(2)),
            Err(PlaygraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn start_after_end_rejected() {
        let files = paths(&["a.json", "b.json", "c.json"]);
        assert!(matches!(
            select_range(&files, 2, Some(1)),
            Err(PlaygraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_file_list_rejected() {
        assert!(matches!(
            select_range(&[], 0, None),
            Err(PlaygraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn quiet_run_skips_slice_prescan() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, r#"{"info": {"slice": "0-99"}, "playlists": []}"#).unwrap();
        let files = vec![file];

        assert_eq!(progress_total(&files, true), ProgressTotal::Files(1));
        assert_eq!(progress_total(&files, false), ProgressTotal::Playlists(100));
    }
}
