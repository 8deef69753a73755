//! # Configuration
//!
//! Layered settings for a run, lowest to highest precedence:
//!
//! 1. Built-in defaults from `playgraph_core::primitives`
//! 2. A TOML file (`--config <path>`, else `playgraph.toml` if present)
//! 3. `PLAYGRAPH_DATA_DIR` in the environment
//! 4. Command-line flags (applied by the CLI)

use playgraph_core::PlaygraphError;
use playgraph_core::primitives::{
    DEFAULT_ARTIST_FIELD, DEFAULT_BATCH_SIZE, DEFAULT_DATA_DIR, DEFAULT_TOP_K,
    DEFAULT_TRACK_FIELD,
};
use playgraph_core::source::FieldNames;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "playgraph.toml";

/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "PLAYGRAPH_DATA_DIR";

/// Settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory scanned for `*.json` inputs.
    pub data_dir: PathBuf,
    pub track_field: String,
    pub artist_field: String,
    /// Upserts per store transaction.
    pub batch_size: usize,
    /// Parallel file workers.
    pub jobs: usize,
    /// Abort on a missing identifier instead of skipping the playlist.
    pub strict: bool,
    /// Heaviest edges listed in the summary.
    pub top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            track_field: DEFAULT_TRACK_FIELD.to_string(),
            artist_field: DEFAULT_ARTIST_FIELD.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            jobs: 1,
            strict: true,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from `playgraph.toml` in the
    /// working directory if it exists, then apply the environment.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PlaygraphError> {
        let settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(settings.with_data_dir_override(std::env::var_os(DATA_DIR_ENV)))
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, PlaygraphError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlaygraphError::InvalidArgument(format!(
                "Cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let settings = Self::from_toml_str(&text).map_err(|e| match e {
            PlaygraphError::InvalidArgument(reason) => {
                PlaygraphError::InvalidArgument(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    /// Parse TOML text. Unknown keys and invalid values are rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, PlaygraphError> {
        let settings: Self = toml::from_str(text)
            .map_err(|e| PlaygraphError::InvalidArgument(format!("invalid config: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Replace `data_dir` when the environment provides a non-empty value.
    #[must_use]
    pub fn with_data_dir_override(mut self, value: Option<OsString>) -> Self {
        if let Some(dir) = value
            && !dir.is_empty()
        {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Check values the engine would reject later.
    pub fn validate(&self) -> Result<(), PlaygraphError> {
        if self.batch_size == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(PlaygraphError::InvalidArgument(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.track_field.is_empty() || self.artist_field.is_empty() {
            return Err(PlaygraphError::InvalidArgument(
                "identifier field names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Identifier field names for the source and extractor.
    #[must_use]
    pub fn fields(&self) -> FieldNames {
        FieldNames::new(self.track_field.clone(), self.artist_field.clone())
    }
}
