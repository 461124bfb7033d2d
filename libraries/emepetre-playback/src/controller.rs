//! Player controller - queue policy on top of the engine
//!
//! Turns user intents (load-and-play, next, previous, shuffle, repeat,
//! queue edits) into engine calls, reacts to the engine's `Ended` event and
//! bridges to the persistent store and the OS media session.
//!
//! The controller is driven by the same single thread of control as the
//! engine: call [`PlayerController::tick`] once per frame (the service loop
//! does this) and drain [`PlayerEvent`]s for observers.

use crate::engine::PlaybackEngine;
use crate::error::{PlaybackError, Result};
use crate::events::EngineEvent;
use crate::history::History;
use crate::media::{MediaAction, MediaHandler, MediaMetadata, MediaSession};
use crate::queue::Queue;
use crate::shuffle::Shuffler;
use crate::types::{PlayerConfig, RepeatMode};
use emepetre_audio::BackendFactory;
use emepetre_core::{PersistentStore, ResumeState, Track, TrackId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events for UI observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlayerEvent {
    /// A new track became current (loaded or pre-selected)
    TrackChanged {
        track_id: TrackId,
        index: Option<usize>,
    },
    StateChanged {
        playing: bool,
    },
    PositionChanged {
        current: f64,
        duration: f64,
    },
    TrackEnded {
        track_id: TrackId,
    },
    VolumeChanged {
        volume: f32,
        muted: bool,
    },
    QueueChanged {
        length: usize,
        current_index: Option<usize>,
    },
    ShuffleChanged {
        enabled: bool,
    },
    RepeatChanged {
        mode: RepeatMode,
    },
    LoadingChanged {
        loading: bool,
    },
    /// Initialization, fetch or decode failure worth showing to the user
    Error {
        message: String,
    },
}

pub struct PlayerController {
    engine: PlaybackEngine,
    store: Arc<dyn PersistentStore>,
    media: Option<Box<dyn MediaSession>>,
    media_tx: mpsc::UnboundedSender<MediaAction>,
    media_rx: mpsc::UnboundedReceiver<MediaAction>,
    queue: Queue,
    shuffler: Shuffler,
    shuffle: bool,
    repeat: RepeatMode,
    history: History,
    current: Option<Track>,
    loading: bool,
    /// Position to seek to when a pre-selected track is first played
    resume_position: Option<f64>,
    ended_pending: bool,
    config: PlayerConfig,
    pending_events: Vec<PlayerEvent>,
}

impl PlayerController {
    /// Build a controller; the audio backend is only created on first use
    pub fn new(
        factory: Arc<dyn BackendFactory>,
        store: Arc<dyn PersistentStore>,
        config: PlayerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut engine = PlaybackEngine::with_frame_interval(factory, config.frame_interval());
        engine.set_volume(config.initial_volume);
        engine.apply_preset(config.equalizer_preset);

        let (media_tx, media_rx) = mpsc::unbounded_channel();
        Ok(Self {
            engine,
            store,
            media: None,
            media_tx,
            media_rx,
            queue: Queue::new(),
            shuffler: Shuffler::new(config.shuffle_seed),
            shuffle: config.shuffle,
            repeat: config.repeat,
            history: History::new(),
            current: None,
            loading: false,
            resume_position: None,
            ended_pending: false,
            config,
            pending_events: Vec::new(),
        })
    }

    /// Attach an OS media session
    #[must_use]
    pub fn with_media_session(mut self, session: Box<dyn MediaSession>) -> Self {
        self.media = Some(session);
        self
    }

    // ===== Loading =====

    /// Load `track` and start playing it
    ///
    /// With `queue`, both queue orders are replaced once the track has
    /// loaded; without it the queue is left alone.
    pub async fn load_and_play(&mut self, track: Track, queue: Option<Vec<Track>>) -> Result<()> {
        self.resume_position = None;
        self.play_track(track, queue).await
    }

    async fn play_track(&mut self, track: Track, queue: Option<Vec<Track>>) -> Result<()> {
        self.set_loading(true);
        let result = self.load_track(&track).await;
        self.set_loading(false);
        if let Err(e) = result {
            // Engine failures already arrive as engine error events
            self.absorb_engine_events();
            if matches!(e, PlaybackError::Store(_)) {
                self.emit(PlayerEvent::Error {
                    message: format!("Audio file not available: {e}"),
                });
            }
            return Err(e);
        }

        if let Some(tracks) = queue {
            let shuffler = self.shuffle.then_some(&mut self.shuffler);
            self.queue.replace(tracks, Some(&track.id), shuffler);
            self.emit_queue_changed();
        }

        tracing::info!(track_id = %track.id, title = %track.title, "playing track");
        self.history.push(track.id.clone());
        self.bind_media(&track);
        self.current = Some(track.clone());
        self.emit(PlayerEvent::TrackChanged {
            track_id: track.id.clone(),
            index: self.queue.current_index(),
        });

        let started = self.engine.play();
        self.absorb_engine_events();

        if let Err(e) = self.store.increment_play_count(&track.id).await {
            tracing::warn!(track_id = %track.id, error = %e, "failed to increment play count");
        }
        if let Err(e) = self.store.append_history(&track.id).await {
            tracing::warn!(track_id = %track.id, error = %e, "failed to record history");
        }

        started
    }

    async fn load_track(&mut self, track: &Track) -> Result<()> {
        self.engine.initialize()?;
        let bytes = self.store.get_track_audio(&track.id).await.map_err(|e| {
            tracing::error!(track_id = %track.id, error = %e, "audio file not available");
            PlaybackError::from(e)
        })?;
        self.engine.load(bytes).await
    }

    fn bind_media(&mut self, track: &Track) {
        let Some(session) = self.media.as_mut() else {
            return;
        };
        let tx = self.media_tx.clone();
        let handler: MediaHandler = Arc::new(move |action: MediaAction| {
            // The receiver lives as long as the controller
            let _ = tx.send(action);
        });
        session.bind(&MediaMetadata::from(track), handler);
    }

    // ===== Transport =====

    /// Resume playback; a pre-selected track is loaded first
    pub async fn play(&mut self) -> Result<()> {
        if !self.engine.has_track() {
            let track = self.current.clone().ok_or(PlaybackError::NoTrackLoaded)?;
            let resume_at = self.resume_position.take();
            self.play_track(track, None).await?;
            if let Some(position) = resume_at {
                self.engine.seek(position)?;
                self.absorb_engine_events();
            }
            return Ok(());
        }

        let result = self.engine.play();
        self.absorb_engine_events();
        result
    }

    /// Pause and checkpoint the resume state
    pub async fn pause(&mut self) {
        self.engine.pause();
        self.absorb_engine_events();
        self.save_state().await;
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.absorb_engine_events();
    }

    pub fn seek(&mut self, position: f64) -> Result<()> {
        let result = self.engine.seek(position);
        self.absorb_engine_events();
        result
    }

    /// Advance to the next queue entry
    ///
    /// Past the end the queue wraps only with repeat-all; otherwise playback
    /// stops and the index stays on the last track.
    pub async fn next(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        let mut index = self.queue.current_index().map_or(0, |i| i + 1);
        if index >= self.queue.len() {
            if self.repeat == RepeatMode::All {
                index = 0;
            } else {
                tracing::debug!("end of queue");
                self.stop();
                return Ok(());
            }
        }

        self.play_index(index).await
    }

    /// Restart the current track, or go back one entry near its start
    pub async fn previous(&mut self) -> Result<()> {
        if self.engine.current_time() > self.config.previous_restart_threshold_secs {
            return self.seek(0.0);
        }
        if self.queue.is_empty() {
            return Ok(());
        }

        let index = match self.queue.current_index() {
            Some(i) if i > 0 => i - 1,
            _ => self.queue.len() - 1,
        };
        self.play_index(index).await
    }

    async fn play_index(&mut self, index: usize) -> Result<()> {
        let Some(track) = self.queue.get(index).cloned() else {
            return Ok(());
        };
        self.queue.set_current(Some(index));
        self.emit_queue_changed();
        self.resume_position = None;
        self.play_track(track, None).await
    }

    async fn handle_ended(&mut self) -> Result<()> {
        if let Some(track) = &self.current {
            self.pending_events.push(PlayerEvent::TrackEnded {
                track_id: track.id.clone(),
            });
        }

        if self.repeat == RepeatMode::One {
            self.engine.seek(0.0)?;
            let result = self.engine.play();
            self.absorb_engine_events();
            return result;
        }
        self.next().await
    }

    /// Drive scheduled work: media actions, engine tick, end-of-track policy
    pub async fn tick(&mut self) {
        while let Ok(action) = self.media_rx.try_recv() {
            if let Err(e) = self.handle_media_action(action).await {
                tracing::warn!(?action, error = %e, "media action failed");
            }
        }

        self.engine.tick();
        self.absorb_engine_events();

        if std::mem::take(&mut self.ended_pending) {
            if let Err(e) = self.handle_ended().await {
                tracing::warn!(error = %e, "failed to continue after track end");
            }
        }
    }

    /// Apply an OS media-session action
    pub async fn handle_media_action(&mut self, action: MediaAction) -> Result<()> {
        tracing::debug!(?action, "media action");
        match action {
            MediaAction::Play => self.play().await,
            MediaAction::Pause => {
                self.pause().await;
                Ok(())
            }
            MediaAction::NextTrack => self.next().await,
            MediaAction::PreviousTrack => self.previous().await,
            MediaAction::SeekTo { position } => self.seek(position),
        }
    }

    // ===== Volume =====

    /// Set the master volume; also unmutes
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
        self.emit_volume_changed();
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.engine.is_muted();
        self.engine.set_muted(muted);
        self.emit_volume_changed();
    }

    // ===== Modes =====

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
        let current = self.current.as_ref().map(|t| &t.id);
        if self.shuffle {
            self.queue.shuffle_on(&mut self.shuffler, current);
        } else {
            self.queue.shuffle_off(current);
        }
        self.emit(PlayerEvent::ShuffleChanged {
            enabled: self.shuffle,
        });
        self.emit_queue_changed();
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.emit(PlayerEvent::RepeatChanged { mode: self.repeat });
        self.repeat
    }

    // ===== Queue edits =====

    /// Replace the queue without loading anything
    ///
    /// With shuffle on, the track at `index` is pinned first.
    pub fn set_queue(&mut self, tracks: Vec<Track>, index: usize) {
        let selected = tracks.get(index).map(|t| t.id.clone());
        if selected.is_none() && !tracks.is_empty() {
            tracing::warn!(index, len = tracks.len(), "queue index out of range, using 0");
        }
        let shuffler = self.shuffle.then_some(&mut self.shuffler);
        self.queue.replace(tracks, selected.as_ref(), shuffler);
        self.emit_queue_changed();
    }

    pub fn add_to_queue(&mut self, track: Track) {
        self.queue.push(track);
        self.emit_queue_changed();
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        let removed = self.queue.remove(index);
        if removed.is_some() {
            self.emit_queue_changed();
        }
        removed
    }

    pub fn move_in_queue(&mut self, from: usize, to: usize) -> bool {
        let moved = self.queue.move_item(from, to);
        if moved {
            self.emit_queue_changed();
        }
        moved
    }

    // ===== Persistence =====

    /// Pre-select `track` without playing it
    ///
    /// The volume applies immediately and the media session is bound to the
    /// track; the position is used by the next [`play`](Self::play).
    pub fn restore(&mut self, track: Track, state: &ResumeState) {
        if track.id != state.track_id {
            tracing::warn!(
                track_id = %track.id,
                saved = %state.track_id,
                "resume state belongs to another track"
            );
        }
        self.engine.set_volume(state.volume);
        self.resume_position = Some(state.position.max(0.0));
        self.bind_media(&track);
        self.emit(PlayerEvent::TrackChanged {
            track_id: track.id.clone(),
            index: self.queue.position_of(&track.id),
        });
        self.current = Some(track);
        self.emit_volume_changed();
    }

    /// Pre-select the last persisted track from `catalog`
    ///
    /// Returns whether a track was restored. Store failures are logged.
    pub async fn restore_from_store(&mut self, catalog: &[Track]) -> bool {
        if !self.config.resume_on_start {
            return false;
        }

        let state = match self.store.load_resume_state().await {
            Ok(Some(state)) => state,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load resume state");
                return false;
            }
        };

        match catalog.iter().find(|t| t.id == state.track_id) {
            Some(track) => {
                tracing::info!(track_id = %track.id, position = state.position, "restoring session");
                self.restore(track.clone(), &state);
                true
            }
            None => {
                tracing::warn!(track_id = %state.track_id, "saved track no longer in catalog");
                false
            }
        }
    }

    /// Write `{track, position, volume}` to the store
    pub async fn save_state(&mut self) {
        let Some(track) = &self.current else {
            return;
        };
        let position = if self.engine.has_track() {
            self.engine.current_time()
        } else {
            self.resume_position.unwrap_or(0.0)
        };
        let state = ResumeState {
            track_id: track.id.clone(),
            position,
            volume: self.engine.volume(),
        };
        if let Err(e) = self.store.save_resume_state(&state).await {
            tracing::warn!(track_id = %state.track_id, error = %e, "failed to save resume state");
        }
    }

    /// Unbind the media session and tear the engine down
    pub fn destroy(&mut self) {
        if let Some(session) = self.media.as_mut() {
            session.unbind();
        }
        self.engine.destroy();
        self.absorb_engine_events();
        self.ended_pending = false;
    }

    // ===== Events =====

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.pending_events.push(event);
    }

    fn emit_queue_changed(&mut self) {
        self.emit(PlayerEvent::QueueChanged {
            length: self.queue.len(),
            current_index: self.queue.current_index(),
        });
    }

    fn emit_volume_changed(&mut self) {
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.engine.volume(),
            muted: self.engine.is_muted(),
        });
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(PlayerEvent::LoadingChanged { loading });
        }
    }

    /// Translate engine events into player events
    fn absorb_engine_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::TimeUpdated { current, duration } => {
                    self.emit(PlayerEvent::PositionChanged { current, duration });
                }
                EngineEvent::StateChanged { playing } => {
                    self.emit(PlayerEvent::StateChanged { playing });
                }
                EngineEvent::Ended => {
                    self.emit(PlayerEvent::StateChanged { playing: false });
                    self.ended_pending = true;
                }
                EngineEvent::Error { message, cause } => {
                    self.emit(PlayerEvent::Error {
                        message: format!("{message}: {cause}"),
                    });
                }
                EngineEvent::Loaded { .. } => {}
            }
        }
    }

    // ===== State =====

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Engine access for equalizer, limiter and analysis controls
    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn position(&self) -> f64 {
        if self.engine.has_track() {
            self.engine.current_time()
        } else {
            self.resume_position.unwrap_or(0.0)
        }
    }

    pub fn duration(&self) -> f64 {
        if self.engine.has_track() {
            self.engine.duration()
        } else {
            self.current.as_ref().map_or(0.0, |t| t.duration)
        }
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.engine.is_muted()
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}

impl std::fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerController")
            .field("engine", &self.engine)
            .field("current", &self.current.as_ref().map(|t| &t.id))
            .field("queue_len", &self.queue.len())
            .field("shuffle", &self.shuffle)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}
