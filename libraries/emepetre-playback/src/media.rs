//! OS media-session integration
//!
//! The controller binds metadata plus an action handler whenever the active
//! track changes and unbinds on teardown. Handlers only enqueue the action;
//! the controller applies it on its next tick.

use emepetre_core::Track;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Now-playing metadata shown by the OS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork: Option<String>,
}

impl From<&Track> for MediaMetadata {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            artwork: track.artwork.clone(),
        }
    }
}

/// Transport action requested from outside (media keys, lock screen)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    SeekTo { position: f64 },
}

pub type MediaHandler = Arc<dyn Fn(MediaAction) + Send + Sync>;

/// Platform media session
pub trait MediaSession: Send {
    /// Publish `metadata` and route OS actions to `handler`
    fn bind(&mut self, metadata: &MediaMetadata, handler: MediaHandler);

    /// Drop the metadata and every handler
    fn unbind(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use emepetre_core::TrackId;

    #[test]
    fn metadata_from_track() {
        let track = Track::new(TrackId::new("t"), "Song", 10.0)
            .with_artist("Band")
            .with_album("Record");
        let metadata = MediaMetadata::from(&track);
        assert_eq!(metadata.title, "Song");
        assert_eq!(metadata.artist, "Band");
        assert_eq!(metadata.album.as_deref(), Some("Record"));
        assert_eq!(metadata.artwork, None);
    }

    #[test]
    fn seek_action_json() {
        let json = serde_json::to_string(&MediaAction::SeekTo { position: 4.0 }).unwrap();
        assert_eq!(json, r#"{"action":"seek-to","position":4.0}"#);
    }
}
