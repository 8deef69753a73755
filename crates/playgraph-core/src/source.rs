//! # Playlist Source
//!
//! Streaming decoder for playlist collection files.
//!
//! An input file holds one JSON object with a `"playlists"` array and any
//! number of unrelated top-level fields (such as an `"info"` block). The
//! source walks the document with `serde`'s pull-based `MapAccess`/`SeqAccess`
//! so only one playlist is materialized at a time:
//! - Unrelated keys are skipped with `IgnoredAny` (parsed, never allocated)
//! - Each track entry keeps only the two configured identifier fields
//! - Every decoded playlist is handed to a caller-supplied callback
//!
//! Any structural problem aborts the whole file with
//! `PlaygraphError::MalformedInput`; malformed playlists are never skipped
//! silently.

use crate::primitives::{
    DEFAULT_ARTIST_FIELD, DEFAULT_TRACK_FIELD, INFO_KEY, PLAYLISTS_KEY, READ_BUFFER_CAPACITY,
    SLICE_KEY, TRACKS_KEY,
};
use crate::{NodeKind, PlaygraphError};
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Message used to unwind serde when the playlist callback fails.
/// The callback's own error is returned instead of this one.
const CALLBACK_ABORTED: &str = "playlist callback aborted the stream";

/// Message used to unwind serde once the info pass has what it needs.
const INFO_SCAN_STOPPED: &str = "info scan stopped early";

// =============================================================================
// INPUT SHAPE
// =============================================================================

/// Names of the identifier fields inside a track entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Field holding the track identifier.
    pub track: String,
    /// Field holding the artist identifier.
    pub artist: String,
}

impl FieldNames {
    /// Create field names from explicit values.
    #[must_use]
    pub fn new(track: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            artist: artist.into(),
        }
    }

    /// The field that carries the identity for `kind`.
    #[must_use]
    pub fn field_for(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Track => &self.track,
            NodeKind::Artist => &self.artist,
        }
    }
}

impl Default for FieldNames {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_FIELD, DEFAULT_ARTIST_FIELD)
    }
}

/// One track entry, reduced to its identifier fields.
///
/// A field is `None` when it was absent or `null` in the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackRef {
    pub track: Option<String>,
    pub artist: Option<String>,
}

impl TrackRef {
    /// Create a track reference with both identifiers present.
    #[must_use]
    pub fn new(track: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track: Some(track.into()),
            artist: Some(artist.into()),
        }
    }

    /// The identifier for `kind`, if present.
    #[must_use]
    pub fn id_for(&self, kind: NodeKind) -> Option<&str> {
        match kind {
            NodeKind::Track => self.track.as_deref(),
            NodeKind::Artist => self.artist.as_deref(),
        }
    }
}

/// A decoded playlist. Lives only while it is being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    /// Zero-based position of the playlist within its file.
    pub index: usize,
    /// Track entries in document order.
    pub tracks: Vec<TrackRef>,
}

/// Counters for one streamed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FileStats {
    pub playlists: usize,
    pub tracks: usize,
}

/// Inclusive playlist range from an `"info": {"slice": "<start>-<end>"}` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: u64,
    pub end: u64,
}

impl SliceRange {
    /// Parse `"<start>-<end>"`. Returns `None` if the text is not a valid
    /// ascending range.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (start, end) = text.trim().split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end: u64 = end.trim().parse().ok()?;
        (start <= end).then_some(Self { start, end })
    }

    /// Number of playlists covered by the range.
    #[must_use]
    pub fn playlist_count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }
}

// =============================================================================
// PLAYLIST SOURCE
// =============================================================================

/// Streams playlists out of collection files.
///
/// The source is stateless between files: each call to [`read_file`]
/// starts a fresh pass over its input.
///
/// [`read_file`]: PlaylistSource::read_file
#[derive(Debug, Clone, Default)]
pub struct PlaylistSource {
    fields: FieldNames,
}

impl PlaylistSource {
    /// Create a source that extracts the given identifier fields.
    #[must_use]
    pub fn new(fields: FieldNames) -> Self {
        Self { fields }
    }

    /// The identifier fields this source keeps.
    #[must_use]
    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Stream every playlist of the file at `path` into `visit`, in
    /// document order.
    ///
    /// Stops at the first error. An error returned by `visit` is passed
    /// through unchanged.
    pub fn read_file<F>(&self, path: &Path, visit: F) -> Result<FileStats, PlaygraphError>
    where
        F: FnMut(Playlist) -> Result<(), PlaygraphError>,
    {
        let file = File::open(path)
            .map_err(|e| PlaygraphError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, file);
        self.read_from(reader, &path.display().to_string(), visit)
    }

    /// Stream playlists from any reader. `source_name` labels errors.
    pub fn read_from<R, F>(
        &self,
        reader: R,
        source_name: &str,
        visit: F,
    ) -> Result<FileStats, PlaygraphError>
    where
        R: Read,
        F: FnMut(Playlist) -> Result<(), PlaygraphError>,
    {
        let mut state = StreamState {
            fields: &self.fields,
            visit,
            failure: None,
            stats: FileStats::default(),
        };

        let mut de = serde_json::Deserializer::from_reader(reader);
        let outcome = DocumentSeed { state: &mut state }
            .deserialize(&mut de)
            .and_then(|found| de.end().map(|()| found));

        match outcome {
            Ok(true) => Ok(state.stats),
            Ok(false) => Err(PlaygraphError::malformed(
                source_name,
                format!("missing top-level \"{}\" array", PLAYLISTS_KEY),
            )),
            Err(e) => Err(state
                .failure
                .take()
                .unwrap_or_else(|| convert_json_error(source_name, &e))),
        }
    }

    /// Read the optional `info.slice` range of a file.
    ///
    /// Stops as soon as the `info` block is decoded or the `playlists` key
    /// is reached, so only the head of the document is read. An `info`
    /// block after `playlists` is not seen. Returns `Ok(None)` when the
    /// file has no usable slice.
    pub fn read_info(path: &Path) -> Result<Option<SliceRange>, PlaygraphError> {
        let file = File::open(path)
            .map_err(|e| PlaygraphError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, file);
        Self::read_info_from(reader, &path.display().to_string())
    }

    /// Read the optional `info.slice` range from any reader.
    pub fn read_info_from<R: Read>(
        reader: R,
        source_name: &str,
    ) -> Result<Option<SliceRange>, PlaygraphError> {
        let mut scan = InfoScan::default();
        let mut de = serde_json::Deserializer::from_reader(reader);
        let outcome = InfoDocumentSeed { scan: &mut scan }
            .deserialize(&mut de)
            .and_then(|()| de.end());

        match outcome {
            Ok(()) => Ok(scan.slice),
            Err(_) if scan.stopped => Ok(scan.slice),
            Err(e) => Err(convert_json_error(source_name, &e)),
        }
    }
}

fn convert_json_error(source_name: &str, err: &serde_json::Error) -> PlaygraphError {
    match err.classify() {
        serde_json::error::Category::Io => {
            PlaygraphError::Io(format!("Read {}: {}", source_name, err))
        }
        _ => PlaygraphError::malformed(source_name, err),
    }
}

// =============================================================================
// STREAMING VISITORS
// =============================================================================

struct StreamState<'a, F> {
    fields: &'a FieldNames,
    visit: F,
    failure: Option<PlaygraphError>,
    stats: FileStats,
}

/// Top-level object: finds "playlists", skips everything else.
struct DocumentSeed<'s, 'a, F> {
    state: &'s mut StreamState<'a, F>,
}

impl<'de, F> DeserializeSeed<'de> for DocumentSeed<'_, '_, F>
where
    F: FnMut(Playlist) -> Result<(), PlaygraphError>,
{
    type Value = bool;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for DocumentSeed<'_, '_, F>
where
    F: FnMut(Playlist) -> Result<(), PlaygraphError>,
{
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON object with a \"{}\" array", PLAYLISTS_KEY)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<bool, A::Error> {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == PLAYLISTS_KEY {
                map.next_value_seed(PlaylistArraySeed {
                    state: &mut *self.state,
                })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

/// The "playlists" array: decodes one playlist at a time and hands it off.
struct PlaylistArraySeed<'s, 'a, F> {
    state: &'s mut StreamState<'a, F>,
}

impl<'de, F> DeserializeSeed<'de> for PlaylistArraySeed<'_, '_, F>
where
    F: FnMut(Playlist) -> Result<(), PlaygraphError>,
{
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for PlaylistArraySeed<'_, '_, F>
where
    F: FnMut(Playlist) -> Result<(), PlaygraphError>,
{
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of playlist objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let state = self.state;
        loop {
            let index = state.stats.playlists;
            let seed = PlaylistSeed {
                fields: state.fields,
                index,
            };
            let Some(tracks) = seq.next_element_seed(seed)? else {
                return Ok(());
            };

            state.stats.playlists += 1;
            state.stats.tracks += tracks.len();

            if let Err(e) = (state.visit)(Playlist { index, tracks }) {
                state.failure = Some(e);
                return Err(de::Error::custom(CALLBACK_ABORTED));
            }
        }
    }
}

/// One playlist object: requires a "tracks" array.
struct PlaylistSeed<'f> {
    fields: &'f FieldNames,
    index: usize,
}

impl<'de> DeserializeSeed<'de> for PlaylistSeed<'_> {
    type Value = Vec<TrackRef>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for PlaylistSeed<'_> {
    type Value = Vec<TrackRef>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playlist {} as an object", self.index)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut tracks = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == TRACKS_KEY {
                tracks = Some(map.next_value_seed(TrackArraySeed {
                    fields: self.fields,
                })?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        tracks.ok_or_else(|| {
            de::Error::custom(format!(
                "playlist {} has no \"{}\" array",
                self.index, TRACKS_KEY
            ))
        })
    }
}

struct TrackArraySeed<'f> {
    fields: &'f FieldNames,
}

impl<'de> DeserializeSeed<'de> for TrackArraySeed<'_> {
    type Value = Vec<TrackRef>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for TrackArraySeed<'_> {
    type Value = Vec<TrackRef>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of track objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut tracks = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(track) = seq.next_element_seed(TrackSeed {
            fields: self.fields,
        })? {
            tracks.push(track);
        }
        Ok(tracks)
    }
}

/// One track object: keeps the configured identifier fields only.
struct TrackSeed<'f> {
    fields: &'f FieldNames,
}

impl<'de> DeserializeSeed<'de> for TrackSeed<'_> {
    type Value = TrackRef;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<TrackRef, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for TrackSeed<'_> {
    type Value = TrackRef;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a track object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<TrackRef, A::Error> {
        let mut track = TrackRef::default();
        while let Some(key) = map.next_key::<String>()? {
            let is_track = key == self.fields.track;
            let is_artist = key == self.fields.artist;
            if !is_track && !is_artist {
                map.next_value::<IgnoredAny>()?;
                continue;
            }

            let value: Option<String> = map.next_value()?;
            if is_track && is_artist {
                track.track.clone_from(&value);
                track.artist = value;
            } else if is_track {
                track.track = value;
            } else {
                track.artist = value;
            }
        }
        Ok(track)
    }
}

/// Result of the info pass. `stopped` marks a deliberate early exit.
#[derive(Debug, Default)]
struct InfoScan {
    slice: Option<SliceRange>,
    stopped: bool,
}

/// Top-level object for the info pass: finds "info", skips keys before it
/// and stops at "info" or "playlists".
struct InfoDocumentSeed<'a> {
    scan: &'a mut InfoScan,
}

impl<'de> DeserializeSeed<'de> for InfoDocumentSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for InfoDocumentSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            if key == INFO_KEY {
                let info: serde_json::Value = map.next_value()?;
                self.scan.slice = info
                    .get(SLICE_KEY)
                    .and_then(serde_json::Value::as_str)
                    .and_then(SliceRange::parse);
                self.scan.stopped = true;
                return Err(de::Error::custom(INFO_SCAN_STOPPED));
            }
            if key == PLAYLISTS_KEY {
                self.scan.stopped = true;
                return Err(de::Error::custom(INFO_SCAN_STOPPED));
            }
            map.next_value::<IgnoredAny>()?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
