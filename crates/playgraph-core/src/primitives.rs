//! # Primitives
//!
//! Compiled-in defaults and format constants for playgraph.
//!
//! These are defaults only. Every value that affects a run is passed
//! explicitly into the engine, sinks, and pipeline through their
//! constructors; nothing here is read as global state at runtime.

/// Top-level key holding the playlist array.
pub const PLAYLISTS_KEY: &str = "playlists";

/// Key of the track array inside a playlist object.
pub const TRACKS_KEY: &str = "tracks";

/// Top-level key of the optional metadata block.
pub const INFO_KEY: &str = "info";

/// Key inside the metadata block holding the `"<start>-<end>"` playlist range.
pub const SLICE_KEY: &str = "slice";

/// Default track-identifier field of a track entry.
pub const DEFAULT_TRACK_FIELD: &str = "track_uri";

/// Default artist-identifier field of a track entry.
pub const DEFAULT_ARTIST_FIELD: &str = "artist_uri";

/// Default number of upsert operations per store transaction.
///
/// Bounds the size of a single write transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of heaviest edges listed by the summary.
pub const DEFAULT_TOP_K: usize = 10;

/// Default data directory scanned for `*.json` inputs.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default inclusive file-index range: the first two files.
pub const DEFAULT_START_INDEX: usize = 0;
pub const DEFAULT_END_INDEX: usize = 1;

/// Capacity of the buffered reader wrapped around each input file.
pub const READ_BUFFER_CAPACITY: usize = 64 * 1024;

/// Magic bytes for the aggregate snapshot header.
///
/// - Header = Magic Bytes ("PGRF") + Version (u8) before the payload.
pub const MAGIC_BYTES: &[u8; 4] = b"PGRF";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Fixed-point scale for summary statistics (integer-only arithmetic).
pub const MILLIONTHS: u64 = 1_000_000;
