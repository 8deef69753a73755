//! # Run Pipeline
//!
//! Drives a batch run: files are read in order, every playlist is turned
//! into identifiers, expanded into pairs and applied to the run's
//! aggregate, and streaming sinks receive the same updates as they happen.
//!
//! ## Concurrency
//!
//! A sequential run is the reference behavior. With `jobs > 1` and no
//! streaming sink, every file is aggregated independently on a `rayon`
//! pool and the partial aggregates are merged in file order. Because
//! `Aggregate::merge` is associative and commutative the result is
//! identical to the sequential one.
//!
//! ## Failure policy
//!
//! - A malformed file aborts the run; streaming sinks discard the
//!   uncommitted part of that file
//! - A sink that tolerates failures is skipped for the rest of the
//!   current file and resumes with the next one
//! - Any other sink failure aborts the run
//! - Cancellation is checked between files only

use crate::aggregate::{Aggregate, PlaylistUpdates};
use crate::extractor::IdentifierExtractor;
use crate::sink::GraphSink;
use crate::source::{FieldNames, FileStats, Playlist, PlaylistSource};
use crate::{NodeKind, PlaygraphError};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Which identifier becomes the node identity.
    pub node_kind: NodeKind,
    /// Identifier field names inside track entries.
    pub fields: FieldNames,
    /// Abort on a track missing its identifier instead of skipping the
    /// playlist.
    pub strict: bool,
    /// Number of parallel file workers.
    pub jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            node_kind: NodeKind::default(),
            fields: FieldNames::default(),
            strict: true,
            jobs: 1,
        }
    }
}

// =============================================================================
// OBSERVATION
// =============================================================================

/// Progress hooks. Called from worker threads in a parallel run.
pub trait RunObserver: Sync {
    fn file_started(&self, _index: usize, _path: &Path) {}

    fn playlist_ingested(&self) {}

    fn file_finished(&self, _index: usize, _path: &Path, _stats: &FileStats) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

static NOOP_OBSERVER: NoopObserver = NoopObserver;

// =============================================================================
// OUTCOME
// =============================================================================

/// A tolerated sink failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkFailure {
    pub sink: String,
    pub file: PathBuf,
    pub reason: String,
}

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files_processed: usize,
    pub playlists: usize,
    pub tracks: usize,
    /// Playlists skipped in lenient mode.
    pub skipped_playlists: usize,
    pub sink_failures: Vec<SinkFailure>,
    /// The run stopped early at a file boundary.
    pub cancelled: bool,
}

/// The result of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub aggregate: Aggregate,
    pub stats: RunStats,
}

#[derive(Debug, Default)]
struct FileReport {
    stats: FileStats,
    skipped_playlists: usize,
    sink_failures: Vec<SinkFailure>,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Orchestrates source, extractor, aggregate and sinks for one run.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    source: PlaylistSource,
    extractor: IdentifierExtractor,
    observer: &'a dyn RunObserver,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline.
    ///
    /// Returns `PlaygraphError::InvalidArgument` when `jobs` is zero.
    pub fn new(config: PipelineConfig) -> Result<Self, PlaygraphError> {
        if config.jobs == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "jobs must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            source: PlaylistSource::new(config.fields.clone()),
            extractor: IdentifierExtractor::new(config.node_kind, &config.fields),
            config,
            observer: &NOOP_OBSERVER,
            cancel: None,
        })
    }

    /// Report progress to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Stop at the next file boundary once `flag` is set.
    #[must_use]
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The run settings.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `files` in order.
    ///
    /// `streaming` sinks receive every playlist's updates as they are
    /// applied and an `end_file` call at each file boundary. They are not
    /// finalized here.
    pub fn run(
        &self,
        files: &[PathBuf],
        streaming: &mut [&mut dyn GraphSink],
    ) -> Result<RunOutcome, PlaygraphError> {
        info!(
            files = files.len(),
            node_kind = %self.config.node_kind,
            strict = self.config.strict,
            jobs = self.config.jobs,
            "starting run"
        );

        let outcome = if self.config.jobs > 1 && streaming.is_empty() {
            self.run_parallel(files)?
        } else {
            self.run_sequential(files, streaming)?
        };

        info!(
            files = outcome.stats.files_processed,
            playlists = outcome.stats.playlists,
            nodes = outcome.aggregate.node_count(),
            edges = outcome.aggregate.edge_count(),
            cancelled = outcome.stats.cancelled,
            "run finished"
        );
        Ok(outcome)
    }

    fn run_sequential(
        &self,
        files: &[PathBuf],
        streaming: &mut [&mut dyn GraphSink],
    ) -> Result<RunOutcome, PlaygraphError> {
        let mut aggregate = Aggregate::new();
        let mut stats = RunStats::default();

        for (index, path) in files.iter().enumerate() {
            if self.is_cancelled() {
                info!(remaining = files.len() - index, "run cancelled");
                stats.cancelled = true;
                break;
            }

            self.observer.file_started(index, path);
            let report = match self.ingest_file(path, &mut aggregate, streaming) {
                Ok(report) => report,
                Err(e) => {
                    for sink in streaming.iter_mut() {
                        sink.abandon_file();
                    }
                    return Err(e);
                }
            };
            self.observer.file_finished(index, path, &report.stats);
            info!(
                file = %path.display(),
                playlists = report.stats.playlists,
                nodes = aggregate.node_count(),
                edges = aggregate.edge_count(),
                "file processed"
            );
            absorb(&mut stats, report);
        }

        Ok(RunOutcome { aggregate, stats })
    }

    fn run_parallel(&self, files: &[PathBuf]) -> Result<RunOutcome, PlaygraphError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
            .map_err(|e| PlaygraphError::InvalidArgument(format!("cannot start workers: {}", e)))?;

        let partials: Vec<Option<Result<(Aggregate, FileReport), PlaygraphError>>> =
            pool.install(|| {
                files
                    .par_iter()
                    .enumerate()
                    .map(|(index, path)| {
                        if self.is_cancelled() {
                            return None;
                        }
                        self.observer.file_started(index, path);
                        let mut partial = Aggregate::new();
                        let mut no_sinks: [&mut dyn GraphSink; 0] = [];
                        let result = self
                            .ingest_file(path, &mut partial, &mut no_sinks)
                            .map(|report| {
                                self.observer.file_finished(index, path, &report.stats);
                                debug!(file = %path.display(), "partial aggregate built");
                                (partial, report)
                            });
                        Some(result)
                    })
                    .collect()
            });

        merge_partials(files, partials)
    }

    /// Stream one file into `aggregate` and the streaming sinks.
    fn ingest_file(
        &self,
        path: &Path,
        aggregate: &mut Aggregate,
        streaming: &mut [&mut dyn GraphSink],
    ) -> Result<FileReport, PlaygraphError> {
        let mut report = FileReport::default();
        let mut disabled = vec![false; streaming.len()];

        report.stats = self.source.read_file(path, |playlist| {
            let Some(updates) = self.expand(&playlist, path, &mut report.skipped_playlists)? else {
                return Ok(());
            };
            aggregate.apply(&updates)?;

            for (sink, skip) in streaming.iter_mut().zip(disabled.iter_mut()) {
                if *skip {
                    continue;
                }
                if let Err(e) = updates.replay(&mut **sink) {
                    tolerate(&mut **sink, e, path, &mut report.sink_failures)?;
                    *skip = true;
                }
            }

            self.observer.playlist_ingested();
            Ok(())
        })?;

        for (sink, skip) in streaming.iter_mut().zip(disabled) {
            if skip {
                continue;
            }
            if let Err(e) = sink.end_file() {
                tolerate(&mut **sink, e, path, &mut report.sink_failures)?;
            }
        }

        Ok(report)
    }

    /// Turn a playlist into updates, or `None` when it is skipped in
    /// lenient mode.
    fn expand(
        &self,
        playlist: &Playlist,
        path: &Path,
        skipped: &mut usize,
    ) -> Result<Option<PlaylistUpdates>, PlaygraphError> {
        match self.extractor.extract(playlist) {
            Ok(ids) => Ok(Some(PlaylistUpdates::from_identifiers(ids))),
            Err(e @ PlaygraphError::MissingField { .. }) if !self.config.strict => {
                warn!(file = %path.display(), error = %e, "skipping playlist");
                *skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Merge per-file partials in file order.
///
/// Only the prefix of files before the first cancelled one is kept, so a
/// parallel run reports the same completed files as a sequential one.
fn merge_partials(
    files: &[PathBuf],
    partials: Vec<Option<Result<(Aggregate, FileReport), PlaygraphError>>>,
) -> Result<RunOutcome, PlaygraphError> {
    let mut aggregate = Aggregate::new();
    let mut stats = RunStats::default();
    for (index, (path, partial)) in files.iter().zip(partials).enumerate() {
        let Some(result) = partial else {
            info!(remaining = files.len() - index, "run cancelled");
            stats.cancelled = true;
            break;
        };
        let (partial, report) = result?;
        aggregate.merge(partial)?;
        info!(
            file = %path.display(),
            playlists = report.stats.playlists,
            nodes = aggregate.node_count(),
            edges = aggregate.edge_count(),
            "file merged"
        );
        absorb(&mut stats, report);
    }

    Ok(RunOutcome { aggregate, stats })
}

/// Record a sink failure if the sink tolerates it, otherwise return it.
fn tolerate(
    sink: &mut dyn GraphSink,
    err: PlaygraphError,
    path: &Path,
    failures: &mut Vec<SinkFailure>,
) -> Result<(), PlaygraphError> {
    if !sink.tolerates_failures() {
        return Err(err);
    }

    warn!(
        sink = sink.name(),
        file = %path.display(),
        error = %err,
        "sink write failed, skipping the rest of this file"
    );
    sink.abandon_file();
    failures.push(SinkFailure {
        sink: sink.name().to_string(),
        file: path.to_path_buf(),
        reason: err.to_string(),
    });
    Ok(())
}

fn absorb(stats: &mut RunStats, report: FileReport) {
    stats.files_processed += 1;
    stats.playlists += report.stats.playlists;
    stats.tracks += report.stats.tracks;
    stats.skipped_playlists += report.skipped_playlists;
    stats.sink_failures.extend(report.sink_failures);
}

// =============================================================================
// TESTS
// =============================================================================
