//! Persistence contract consumed by the player

use crate::error::Result;
use crate::types::{ResumeState, TrackId};
use async_trait::async_trait;

/// Local store holding track audio, resume state and listening history
///
/// Every call may fail. The player treats failures of the write methods
/// as non-fatal: they are logged and playback continues.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the encoded audio bytes of a track
    async fn get_track_audio(&self, id: &TrackId) -> Result<Vec<u8>>;

    /// Persist the last playback checkpoint
    async fn save_resume_state(&self, state: &ResumeState) -> Result<()>;

    /// Load the last playback checkpoint, if one was saved
    async fn load_resume_state(&self) -> Result<Option<ResumeState>>;

    /// Bump the play counter of a track
    async fn increment_play_count(&self, id: &TrackId) -> Result<()>;

    /// Record that a track started playing
    async fn append_history(&self, id: &TrackId) -> Result<()>;
}
