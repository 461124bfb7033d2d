//! In-memory `PersistentStore`
//!
//! Backs the headless CLI and the integration tests.

use crate::error::{CoreError, Result};
use crate::store::PersistentStore;
use crate::types::{HistoryEntry, ResumeState, TrackId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    audio: HashMap<TrackId, Vec<u8>>,
    resume: Option<ResumeState>,
    play_counts: HashMap<TrackId, u32>,
    history: Vec<HistoryEntry>,
}

/// Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the encoded audio for a track
    pub async fn insert_audio(&self, id: TrackId, bytes: Vec<u8>) {
        self.inner.write().await.audio.insert(id, bytes);
    }

    /// Play count recorded for a track
    pub async fn play_count(&self, id: &TrackId) -> u32 {
        self.inner
            .read()
            .await
            .play_counts
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// History entries, oldest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.read().await.history.clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get_track_audio(&self, id: &TrackId) -> Result<Vec<u8>> {
        self.inner
            .read()
            .await
            .audio
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::AudioNotFound(id.clone()))
    }

    async fn save_resume_state(&self, state: &ResumeState) -> Result<()> {
        self.inner.write().await.resume = Some(state.clone());
        Ok(())
    }

    async fn load_resume_state(&self) -> Result<Option<ResumeState>> {
        Ok(self.inner.read().await.resume.clone())
    }

    async fn increment_play_count(&self, id: &TrackId) -> Result<()> {
        *self
            .inner
            .write()
            .await
            .play_counts
            .entry(id.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    async fn append_history(&self, id: &TrackId) -> Result<()> {
        self.inner
            .write()
            .await
            .history
            .push(HistoryEntry::now(id.clone()));
        Ok(())
    }
}
