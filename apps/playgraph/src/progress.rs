//! # Progress Display
//!
//! An `indicatif` bar driven by the pipeline's [`RunObserver`] hooks.
//!
//! The bar counts playlists when every selected file declares its
//! `info.slice` range, and files otherwise. It draws to stderr and is
//! released when the reporter is dropped, on every exit path.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use playgraph_core::{FileStats, PlaylistSource, RunObserver};
use std::path::{Path, PathBuf};
use tracing::debug;

const PLAYLIST_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} playlists ({per_sec}, ETA: {eta})";
const FILE_TEMPLATE: &str = "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files";

/// What the bar counts, and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTotal {
    Playlists(u64),
    Files(u64),
}

impl ProgressTotal {
    /// Size the bar for `files`.
    ///
    /// Falls back to counting files if any file lacks a usable slice or
    /// cannot be pre-scanned.
    pub fn for_files(files: &[PathBuf]) -> Self {
        let mut playlists: u64 = 0;
        for path in files {
            match PlaylistSource::read_info(path) {
                Ok(Some(slice)) => playlists = playlists.saturating_add(slice.playlist_count()),
                Ok(None) => return Self::Files(files.len() as u64),
                Err(e) => {
                    debug!(file = %path.display(), error = %e, "slice pre-scan failed");
                    return Self::Files(files.len() as u64);
                }
            }
        }
        Self::Playlists(playlists)
    }

    fn len(self) -> u64 {
        match self {
            Self::Playlists(n) | Self::Files(n) => n,
        }
    }
}

/// Progress bar for one run.
pub struct ProgressReporter {
    bar: ProgressBar,
    total: ProgressTotal,
}

impl ProgressReporter {
    /// Create a reporter. A hidden reporter tracks positions but never draws.
    pub fn new(total: ProgressTotal, hidden: bool) -> Self {
        let bar = ProgressBar::new(total.len());
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let template = match total {
                ProgressTotal::Playlists(_) => PLAYLIST_TEMPLATE,
                ProgressTotal::Files(_) => FILE_TEMPLATE,
            };
            let style = ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
        }
        bar.set_message("building graph");
        Self { bar, total }
    }

    /// Current bar position.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish the bar after a successful run.
    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl RunObserver for ProgressReporter {
    fn file_started(&self, _index: usize, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.bar.set_message(name);
    }

    fn playlist_ingested(&self) {
        if matches!(self.total, ProgressTotal::Playlists(_)) {
            self.bar.inc(1);
        }
    }

    fn file_finished(&self, _index: usize, _path: &Path, _stats: &FileStats) {
        if matches!(self.total, ProgressTotal::Files(_)) {
            self.bar.inc(1);
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
