//! # Identifier Extractor
//!
//! Maps a decoded playlist onto node identifiers for the configured
//! node kind.
//!
//! - One identifier per track entry, in playlist order
//! - Duplicates are preserved here; pairing decides what they mean
//! - A track without the selected field is rejected, never guessed

use crate::source::{FieldNames, Playlist};
use crate::{NodeId, NodeKind, PlaygraphError};

/// Extracts node identifiers from playlists.
#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    kind: NodeKind,
    field: String,
}

impl IdentifierExtractor {
    /// Create an extractor for `kind`, reporting missing fields under the
    /// configured field name.
    #[must_use]
    pub fn new(kind: NodeKind, fields: &FieldNames) -> Self {
        Self {
            kind,
            field: fields.field_for(kind).to_string(),
        }
    }

    /// The node kind this extractor produces.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Produce the ordered identifiers of `playlist`.
    ///
    /// Returns `PlaygraphError::MissingField` for the first track entry
    /// lacking the selected identifier.
    pub fn extract(&self, playlist: &Playlist) -> Result<Vec<NodeId>, PlaygraphError> {
        playlist
            .tracks
            .iter()
            .enumerate()
            .map(|(position, track)| {
                track
                    .id_for(self.kind)
                    .map(NodeId::from)
                    .ok_or_else(|| PlaygraphError::MissingField {
                        field: self.field.clone(),
                        playlist: playlist.index,
                        track: position,
                    })
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TrackRef;

    fn playlist(tracks: Vec<TrackRef>) -> Playlist {
        Playlist { index: 3, tracks }
    }

    #[test]
    fn extracts_artist_ids_with_duplicates() {
        let extractor = IdentifierExtractor::new(NodeKind::Artist, &FieldNames::default());
        let p = playlist(vec![
            TrackRef::new("t:1", "a:1"),
            TrackRef::new("t:2", "a:1"),
            TrackRef::new("t:3", "a:2"),
        ]);

        let ids = extractor.extract(&p).expect("extract");
        let ids: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["a:1", "a:1", "a:2"]);
    }

    #[test]
    fn extracts_track_ids() {
        let extractor = IdentifierExtractor::new(NodeKind::Track, &FieldNames::default());
        let p = playlist(vec![TrackRef::new("t:1", "a:1"), TrackRef::new("t:2", "a:1")]);

        let ids = extractor.extract(&p).expect("extract");
        assert_eq!(ids, vec![NodeId::from("t:1"), NodeId::from("t:2")]);
    }

    #[test]
    fn missing_field_names_playlist_and_track() {
        let extractor = IdentifierExtractor::new(NodeKind::Track, &FieldNames::default());
        let p = playlist(vec![
            TrackRef::new("t:1", "a:1"),
            TrackRef {
                track: None,
                artist: Some("a:2".to_string()),
            },
        ]);

        let err = extractor.extract(&p).expect_err("should fail");
        assert!(matches!(
            err,
            PlaygraphError::MissingField { ref field, playlist: 3, track: 1 } if field == "track_uri"
        ));
    }

    #[test]
    fn empty_playlist_yields_no_ids() {
        let extractor = IdentifierExtractor::new(NodeKind::Artist, &FieldNames::default());
        assert!(extractor.extract(&playlist(Vec::new())).expect("extract").is_empty());
    }
}
