//! Shared fixtures for playback integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use emepetre_audio::{
    AudioBackend, AudioError, BackendFactory, Clock, ContextState, DecodedAudio, ManualClock,
    OutputRing,
};
use emepetre_core::{
    CoreError, MemoryStore, PersistentStore, ResumeState, Track, TrackId,
};
use emepetre_playback::{MediaAction, MediaHandler, MediaMetadata, MediaSession, PlaybackEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ===== Mock Backend =====

/// State shared between a test and the backends its factory creates
#[derive(Debug)]
pub struct BackendControl {
    pub state: ContextState,
    /// When set, `resume()` leaves the context suspended until
    /// [`Harness::complete_resume`]
    pub defer_resume: bool,
    pub resume_requests: usize,
    pub fail_create: bool,
}

struct MockBackend {
    clock: ManualClock,
    control: Arc<Mutex<BackendControl>>,
}

#[async_trait]
impl AudioBackend for MockBackend {
    fn sample_rate(&self) -> u32 {
        8000
    }

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> ContextState {
        self.control.lock().unwrap().state
    }

    fn resume(&self) -> emepetre_audio::Result<()> {
        let mut control = self.control.lock().unwrap();
        if control.state == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        control.resume_requests += 1;
        if !control.defer_resume {
            control.state = ContextState::Running;
        }
        Ok(())
    }

    fn close(&self) -> emepetre_audio::Result<()> {
        self.control.lock().unwrap().state = ContextState::Closed;
        Ok(())
    }

    async fn decode(&self, bytes: Vec<u8>) -> emepetre_audio::Result<DecodedAudio> {
        decode_fixture(bytes)
    }
}

/// Accepts `tone:<seconds>` and renders that much silence at 100 Hz
fn decode_fixture(bytes: Vec<u8>) -> emepetre_audio::Result<DecodedAudio> {
    let text = String::from_utf8(bytes)
        .map_err(|_| AudioError::DecodeError("not a test fixture".to_string()))?;
    let seconds: f64 = text
        .strip_prefix("tone:")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AudioError::DecodeError(format!("corrupt data: {text}")))?;
    DecodedAudio::silence(seconds, 2, 100)
}

pub struct MockFactory {
    clock: ManualClock,
    control: Arc<Mutex<BackendControl>>,
}

impl BackendFactory for MockFactory {
    fn create(&self) -> emepetre_audio::Result<Box<dyn AudioBackend>> {
        let mut control = self.control.lock().unwrap();
        if control.fail_create {
            return Err(AudioError::BackendUnavailable("no audio device".to_string()));
        }
        control.state = ContextState::Suspended;
        Ok(Box::new(MockBackend {
            clock: self.clock.clone(),
            control: Arc::clone(&self.control),
        }))
    }
}

// ===== Device Backend =====

/// Backend fed through an `OutputRing`; the test plays the device by
/// calling `OutputRing::fill`, which is also what moves the clock
struct DeviceBackend {
    ring: Arc<OutputRing>,
    running: AtomicBool,
}

#[async_trait]
impl AudioBackend for DeviceBackend {
    fn sample_rate(&self) -> u32 {
        self.ring.sample_rate()
    }

    fn current_time(&self) -> f64 {
        self.ring.seconds_played()
    }

    fn state(&self) -> ContextState {
        if self.running.load(Ordering::SeqCst) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> emepetre_audio::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> emepetre_audio::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn output_demand(&self) -> usize {
        self.ring.demand()
    }

    fn write_output(&self, samples: &[f32]) -> usize {
        self.ring.push(samples)
    }

    async fn decode(&self, bytes: Vec<u8>) -> emepetre_audio::Result<DecodedAudio> {
        decode_fixture(bytes)
    }
}

pub struct DeviceFactory {
    ring: Arc<OutputRing>,
}

impl DeviceFactory {
    pub fn new(ring: Arc<OutputRing>) -> Self {
        Self { ring }
    }
}

impl BackendFactory for DeviceFactory {
    fn create(&self) -> emepetre_audio::Result<Box<dyn AudioBackend>> {
        Ok(Box::new(DeviceBackend {
            ring: Arc::clone(&self.ring),
            running: AtomicBool::new(false),
        }))
    }
}

// ===== Test Helpers =====

pub struct Harness {
    pub clock: ManualClock,
    pub control: Arc<Mutex<BackendControl>>,
    pub factory: Arc<MockFactory>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::new();
        let control = Arc::new(Mutex::new(BackendControl {
            state: ContextState::Suspended,
            defer_resume: false,
            resume_requests: 0,
            fail_create: false,
        }));
        let factory = Arc::new(MockFactory {
            clock: clock.clone(),
            control: Arc::clone(&control),
        });
        Self {
            clock,
            control,
            factory,
        }
    }

    pub fn engine(&self) -> PlaybackEngine {
        PlaybackEngine::new(self.factory.clone())
    }

    pub fn defer_resume(&self) {
        self.control.lock().unwrap().defer_resume = true;
    }

    pub fn fail_create(&self) {
        self.control.lock().unwrap().fail_create = true;
    }

    /// Finish a deferred resume
    pub fn complete_resume(&self) {
        let mut control = self.control.lock().unwrap();
        control.defer_resume = false;
        control.state = ContextState::Running;
    }

    pub fn context_state(&self) -> ContextState {
        self.control.lock().unwrap().state
    }
}

pub fn audio_bytes(seconds: f64) -> Vec<u8> {
    format!("tone:{seconds}").into_bytes()
}

pub fn track(id: &str, seconds: f64) -> Track {
    Track::new(TrackId::new(id), format!("Track {}", id.to_uppercase()), seconds)
        .with_artist("Test Artist")
        .with_album("Test Album")
}

/// `a`, `b`, `c`, ... each `seconds` long
pub fn tracks(ids: &[&str], seconds: f64) -> Vec<Track> {
    ids.iter().map(|id| track(id, seconds)).collect()
}

pub async fn store_with(tracks: &[Track]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for track in tracks {
        store
            .insert_audio(track.id.clone(), audio_bytes(track.duration))
            .await;
    }
    store
}

// ===== Failing Store =====

/// Serves audio but fails every write
pub struct WriteFailingStore {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl PersistentStore for WriteFailingStore {
    async fn get_track_audio(&self, id: &TrackId) -> emepetre_core::Result<Vec<u8>> {
        self.inner.get_track_audio(id).await
    }

    async fn save_resume_state(&self, _state: &ResumeState) -> emepetre_core::Result<()> {
        Err(CoreError::storage("store offline"))
    }

    async fn load_resume_state(&self) -> emepetre_core::Result<Option<ResumeState>> {
        Err(CoreError::storage("store offline"))
    }

    async fn increment_play_count(&self, _id: &TrackId) -> emepetre_core::Result<()> {
        Err(CoreError::storage("store offline"))
    }

    async fn append_history(&self, _id: &TrackId) -> emepetre_core::Result<()> {
        Err(CoreError::storage("store offline"))
    }
}

// ===== Recording Media Session =====

#[derive(Default)]
pub struct MediaLog {
    pub bound: Vec<MediaMetadata>,
    pub unbinds: usize,
    pub handler: Option<MediaHandler>,
}

pub struct RecordingMediaSession {
    pub log: Arc<Mutex<MediaLog>>,
}

impl RecordingMediaSession {
    pub fn new() -> (Self, Arc<Mutex<MediaLog>>) {
        let log = Arc::new(Mutex::new(MediaLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl MediaSession for RecordingMediaSession {
    fn bind(&mut self, metadata: &MediaMetadata, handler: MediaHandler) {
        let mut log = self.log.lock().unwrap();
        log.bound.push(metadata.clone());
        log.handler = Some(handler);
    }

    fn unbind(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.unbinds += 1;
        log.handler = None;
    }
}

/// Press a media key through the bound handler
pub fn press(log: &Arc<Mutex<MediaLog>>, action: MediaAction) {
    let handler = log.lock().unwrap().handler.clone().expect("no media handler bound");
    handler(action);
}
