//! Playback engine - transport state machine over the audio graph
//!
//! ```text
//! Empty --load--> Paused --play--> Playing --pause/stop--> Paused
//!                   ^                 |
//!                   +---- Ended <-----+  (natural end, back to offset 0)
//! ```
//!
//! Position is clock arithmetic: while playing it is
//! `clock_now - start_clock_time`, otherwise the stored offset. The clock is
//! the audio context's, so tests drive it with a `ManualClock`.
//!
//! Nothing here runs on its own. The owner calls [`PlaybackEngine::tick`]
//! once per frame; the tick completes deferred starts, detects the end of
//! the track and reports position.

use crate::error::{PlaybackError, Result};
use crate::events::{EngineEvent, EventBus, EventKind, Subscription};
use crate::schedule::FrameTicker;
use emepetre_audio::{
    AudioError, AudioGraph, BackendFactory, ContextState, DecodedAudio, EqPreset,
    FrequencyResponse, LimiterSettings, EQ_BAND_COUNT,
};
use std::sync::Arc;
use std::time::Duration;

/// A source end only counts when this close to the buffer's duration
pub const END_TOLERANCE_SECS: f64 = 0.1;

/// Default position reporting interval, about one display frame
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Snapshot of the transport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportState {
    pub playing: bool,
    /// Paused position in seconds
    pub position_offset: f64,
    /// Clock time matching buffer position 0; set while playing
    pub start_clock_time: Option<f64>,
}

pub struct PlaybackEngine {
    factory: Arc<dyn BackendFactory>,
    graph: AudioGraph,
    buffer: Option<Arc<DecodedAudio>>,
    transport: TransportState,
    /// Bumped on every load and destroy; deferred starts carry the value
    /// they were issued under
    generation: u64,
    pending_start: Option<u64>,
    ticker: FrameTicker,
    events: EventBus,
    pending_events: Vec<EngineEvent>,
}

impl PlaybackEngine {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self::with_frame_interval(factory, DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(factory: Arc<dyn BackendFactory>, interval: Duration) -> Self {
        Self {
            factory,
            graph: AudioGraph::new(),
            buffer: None,
            transport: TransportState::default(),
            generation: 0,
            pending_start: None,
            ticker: FrameTicker::new(interval),
            events: EventBus::new(),
            pending_events: Vec::new(),
        }
    }

    // ===== Lifecycle =====

    pub fn is_initialized(&self) -> bool {
        self.graph.is_initialized()
    }

    /// Build the audio graph on a fresh backend; no-op once built
    pub fn initialize(&mut self) -> Result<()> {
        if self.graph.is_initialized() {
            return Ok(());
        }

        match self.factory.create() {
            Ok(backend) => {
                self.graph.initialize(backend);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "audio initialization failed");
                self.emit(EngineEvent::Error {
                    message: "Audio initialization failed".to_string(),
                    cause: e.to_string(),
                });
                Err(PlaybackError::Initialization(e.to_string()))
            }
        }
    }

    /// Decode `bytes` and make them the current buffer, paused at 0
    ///
    /// Any playback or deferred start is cancelled first. On decode failure
    /// the previous buffer (if any) stays loaded.
    pub async fn load(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.initialize()?;
        self.cancel_playback();
        self.transport.position_offset = 0.0;

        let decoded = match self.graph.decode(bytes).await {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::error!(error = %e, "failed to decode track");
                self.emit(EngineEvent::Error {
                    message: "Failed to decode audio".to_string(),
                    cause: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let event = EngineEvent::Loaded {
            duration: decoded.duration(),
            channels: decoded.channels(),
            sample_rate: decoded.sample_rate(),
        };
        tracing::debug!(duration = decoded.duration(), "track loaded");
        self.buffer = Some(Arc::new(decoded));
        self.emit(event);
        Ok(())
    }

    /// Start playing from the stored offset
    ///
    /// If the context is suspended a resume is requested and the start is
    /// deferred to a later tick, provided no load, stop or pause intervenes.
    pub fn play(&mut self) -> Result<()> {
        self.initialize()?;
        if self.transport.playing || self.pending_start.is_some() {
            return Ok(());
        }
        if self.buffer.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }

        match self.graph.context_state() {
            Some(ContextState::Running) => self.start_now(),
            Some(ContextState::Suspended) => {
                self.graph.resume()?;
                if self.graph.context_state() == Some(ContextState::Running) {
                    self.start_now()
                } else {
                    tracing::debug!(generation = self.generation, "start deferred until resume");
                    self.pending_start = Some(self.generation);
                    Ok(())
                }
            }
            Some(ContextState::Closed) => Err(AudioError::ContextClosed.into()),
            None => Err(AudioError::NotInitialized.into()),
        }
    }

    fn start_now(&mut self) -> Result<()> {
        let buffer = self.buffer.clone().ok_or(PlaybackError::NoTrackLoaded)?;
        let offset = self.transport.position_offset;
        let now = self.graph.current_time();

        self.graph.start_source(buffer, offset)?;
        self.transport.start_clock_time = Some(now - offset);
        self.transport.playing = true;
        self.ticker.start(now);
        self.emit(EngineEvent::StateChanged { playing: true });
        Ok(())
    }

    pub fn pause(&mut self) {
        self.pending_start = None;
        if !self.transport.playing {
            return;
        }

        self.transport.position_offset = self.current_time();
        self.transport.playing = false;
        self.transport.start_clock_time = None;
        self.graph.stop_source();
        self.ticker.cancel();
        self.emit(EngineEvent::StateChanged { playing: false });
    }

    /// Stop and rewind to 0
    pub fn stop(&mut self) {
        self.pending_start = None;
        self.graph.stop_source();
        self.ticker.cancel();
        self.transport = TransportState::default();
        self.emit(EngineEvent::TimeUpdated {
            current: 0.0,
            duration: self.duration(),
        });
        self.emit(EngineEvent::StateChanged { playing: false });
    }

    /// Move to `position` seconds, clamped to the track
    ///
    /// While playing the source restarts at the new offset and the
    /// transport stays playing.
    pub fn seek(&mut self, position: f64) -> Result<()> {
        let buffer = self.buffer.clone().ok_or(PlaybackError::NoTrackLoaded)?;
        if !position.is_finite() {
            tracing::warn!(position, "ignoring non-finite seek position");
            return Ok(());
        }

        let position = position.clamp(0.0, buffer.duration());
        self.transport.position_offset = position;
        if self.transport.playing {
            let now = self.graph.current_time();
            self.graph.start_source(buffer, position)?;
            self.transport.start_clock_time = Some(now - position);
        }

        self.emit(EngineEvent::TimeUpdated {
            current: position,
            duration: self.duration(),
        });
        Ok(())
    }

    /// Advance the engine's scheduled work; call once per frame
    ///
    /// Also tops up the output device of backends that have one.
    pub fn tick(&mut self) {
        self.complete_pending_start();
        self.graph.pump();

        if !self.transport.playing {
            return;
        }

        let now = self.graph.current_time();
        let duration = self.duration();
        let elapsed = self
            .transport
            .start_clock_time
            .map_or(0.0, |start| now - start);

        if self.graph.source_ended() && elapsed >= duration - END_TOLERANCE_SECS {
            self.finish();
            return;
        }

        if self.ticker.poll(now) {
            self.emit(EngineEvent::TimeUpdated {
                current: self.current_time(),
                duration,
            });
        }
    }

    fn complete_pending_start(&mut self) {
        let Some(generation) = self.pending_start else {
            return;
        };
        if generation != self.generation {
            tracing::debug!(generation, "dropping stale deferred start");
            self.pending_start = None;
            return;
        }
        if self.graph.context_state() != Some(ContextState::Running) {
            return;
        }

        self.pending_start = None;
        if let Err(e) = self.start_now() {
            tracing::error!(error = %e, "deferred start failed");
        }
    }

    /// Natural end: back to paused at 0, announcing only `Ended`
    fn finish(&mut self) {
        self.graph.stop_source();
        self.ticker.cancel();
        self.transport = TransportState::default();
        tracing::debug!("track ended");
        self.emit(EngineEvent::Ended);
    }

    fn cancel_playback(&mut self) {
        let was_playing = self.transport.playing;
        self.generation += 1;
        self.pending_start = None;
        self.graph.stop_source();
        self.ticker.cancel();
        self.transport.playing = false;
        self.transport.start_clock_time = None;
        if was_playing {
            self.emit(EngineEvent::StateChanged { playing: false });
        }
    }

    /// Pull interleaved stereo output from the graph
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        self.graph.render(out)
    }

    /// Stop, release the graph and drop every listener
    ///
    /// Safe to call repeatedly; the engine can be initialized again later.
    pub fn destroy(&mut self) {
        if self.buffer.is_some() || self.transport.playing {
            self.stop();
        }
        self.generation += 1;
        self.pending_start = None;
        self.ticker.cancel();
        self.graph.destroy();
        self.buffer = None;
        self.transport = TransportState::default();
        self.events.clear_all();
    }

    // ===== Events =====

    /// Listen to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> Subscription
    where
        F: FnMut(&EngineEvent) + Send + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn off(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    pub fn clear_listeners(&mut self, kind: EventKind) {
        self.events.clear_kind(kind);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.emit(&event);
        self.pending_events.push(event);
    }

    // ===== Transport queries =====

    pub fn is_playing(&self) -> bool {
        self.transport.playing
    }

    pub fn is_start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    pub fn has_track(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    /// Current position in seconds, within `[0, duration]`
    pub fn current_time(&self) -> f64 {
        match self.transport.start_clock_time {
            Some(start) if self.transport.playing => {
                (self.graph.current_time() - start).clamp(0.0, self.duration())
            }
            _ => self.transport.position_offset,
        }
    }

    pub fn duration(&self) -> f64 {
        self.buffer.as_ref().map_or(0.0, |b| b.duration())
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.graph.context_state()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.graph.sample_rate()
    }

    // ===== Gain and mute =====

    pub fn set_volume(&mut self, volume: f32) {
        self.graph.set_master_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.graph.volume()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.graph.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.graph.is_muted()
    }

    pub fn set_preamp(&mut self, db: f32) {
        self.graph.set_preamp_db(db);
    }

    pub fn preamp(&self) -> f32 {
        self.graph.preamp_db()
    }

    // ===== Equalizer =====

    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        self.graph.equalizer_mut().set_band_gain(index, gain_db);
    }

    pub fn set_all_bands(&mut self, gains: &[f32]) {
        self.graph.equalizer_mut().set_all_bands(gains);
    }

    pub fn band_gains(&self) -> [f32; EQ_BAND_COUNT] {
        self.graph.equalizer().gains()
    }

    /// Flatten every band and the preamp
    pub fn reset_equalizer(&mut self) {
        self.graph.equalizer_mut().reset();
        self.graph.set_preamp_db(0.0);
    }

    /// Set all bands and the preamp from `preset`
    pub fn apply_preset(&mut self, preset: EqPreset) {
        self.graph.equalizer_mut().apply_preset(preset);
        self.graph.set_preamp_db(preset.preamp_db());
    }

    pub fn frequency_response(&self, frequencies: &[f32]) -> FrequencyResponse {
        self.graph.equalizer().frequency_response(frequencies)
    }

    // ===== Limiter =====

    pub fn set_limiter_threshold(&mut self, db: f32) {
        self.graph.limiter_mut().set_threshold(db);
    }

    pub fn set_limiter_knee(&mut self, db: f32) {
        self.graph.limiter_mut().set_knee(db);
    }

    pub fn set_limiter_ratio(&mut self, ratio: f32) {
        self.graph.limiter_mut().set_ratio(ratio);
    }

    pub fn limiter_settings(&self) -> LimiterSettings {
        self.graph.limiter().settings()
    }

    /// Current gain reduction in dB (0 or negative)
    pub fn limiter_reduction(&self) -> f32 {
        self.graph.limiter().current_reduction()
    }

    // ===== Analysis =====

    pub fn frequency_data(&mut self) -> Vec<u8> {
        self.graph.frequency_data()
    }

    pub fn waveform_data(&self) -> Vec<u8> {
        self.graph.waveform_data()
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("transport", &self.transport)
            .field("duration", &self.duration())
            .field("generation", &self.generation)
            .field("pending_start", &self.pending_start)
            .field("listeners", &self.events)
            .finish_non_exhaustive()
    }
}
