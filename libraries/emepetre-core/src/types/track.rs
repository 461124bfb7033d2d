/// Track domain type
use super::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An imported audio track
///
/// Owned by the catalog. The playback core reads it and never mutates
/// `favorite` or `play_count`; collaborators do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,

    /// Duration in seconds
    pub duration: f64,

    /// Artwork reference (URL or data URI)
    pub artwork: Option<String>,

    pub favorite: bool,
    pub play_count: u32,

    /// Original file name and size in bytes
    pub file_name: String,
    pub file_size: u64,

    /// Encoded bitrate in kbps, when known
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,

    /// Folder path relative to the imported root, if imported from a folder
    pub folder: Option<String>,

    pub added_at: DateTime<Utc>,
}

impl Track {
    /// Create a track with only the fields playback needs
    pub fn new(id: TrackId, title: impl Into<String>, duration: f64) -> Self {
        let title = title.into();
        Self {
            id,
            file_name: title.clone(),
            title,
            artist: String::new(),
            album: None,
            genre: None,
            year: None,
            duration,
            artwork: None,
            favorite: false,
            play_count: 0,
            file_size: 0,
            bitrate: None,
            sample_rate: None,
            folder: None,
            added_at: Utc::now(),
        }
    }

    /// Set the artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the artwork reference
    #[must_use]
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Set the source file name and size
    #[must_use]
    pub fn with_file(mut self, file_name: impl Into<String>, file_size: u64) -> Self {
        self.file_name = file_name.into();
        self.file_size = file_size;
        self
    }

    /// Display label, "Artist - Title" or just the title
    pub fn display_name(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_fields() {
        let track = Track::new(TrackId::new("1"), "Song", 180.0)
            .with_artist("Band")
            .with_album("Record")
            .with_file("song.flac", 1024);

        assert_eq!(track.artist, "Band");
        assert_eq!(track.album.as_deref(), Some("Record"));
        assert_eq!(track.file_name, "song.flac");
        assert_eq!(track.file_size, 1024);
        assert_eq!(track.display_name(), "Band - Song");
    }

    #[test]
    fn display_name_without_artist() {
        let track = Track::new(TrackId::new("1"), "Untitled", 1.0);
        assert_eq!(track.display_name(), "Untitled");
    }

    #[test]
    fn json_uses_camel_case() {
        let track = Track::new(TrackId::new("1"), "Song", 1.0);
        let json = serde_json::to_value(&track).unwrap();
        assert!(json.get("playCount").is_some());
        assert!(json.get("fileName").is_some());
    }
}
