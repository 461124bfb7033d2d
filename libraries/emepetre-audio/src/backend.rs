//! Audio backend abstraction
//!
//! A backend is the platform audio context: it owns the clock, decodes
//! encoded files and can be suspended, resumed and closed. Backends with an
//! output device report how many frames they can take and receive rendered
//! blocks from the graph; `HeadlessBackend` takes none and leaves rendering
//! to its caller.

use crate::buffer::DecodedAudio;
use crate::clock::Clock;
use crate::decoder::SymphoniaDecoder;
use crate::error::{AudioError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Created but not producing audio (needs a user gesture on some platforms)
    Suspended,
    /// Clock is advancing
    Running,
    /// Released, cannot be resumed
    Closed,
}

impl ContextState {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Suspended => 0,
            Self::Running => 1,
            Self::Closed => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Suspended,
            1 => Self::Running,
            _ => Self::Closed,
        }
    }
}

/// Platform audio context
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Context clock in seconds
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    /// Ask the context to start running
    ///
    /// Returns once the request is issued. The context may still report
    /// `Suspended` afterwards; callers poll `state()` to see it complete.
    fn resume(&self) -> Result<()>;

    /// Release the context. Closing twice is not an error.
    fn close(&self) -> Result<()>;

    /// Frames the output device can accept right now
    fn output_demand(&self) -> usize {
        0
    }

    /// Hand interleaved stereo frames to the output device; returns frames
    /// accepted
    fn write_output(&self, _samples: &[f32]) -> usize {
        0
    }

    /// Decode a complete encoded file
    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio>;
}

/// Run the symphonia decoder on the blocking pool
pub(crate) async fn decode_off_thread(bytes: Vec<u8>) -> Result<DecodedAudio> {
    tokio::task::spawn_blocking(move || SymphoniaDecoder::decode_bytes(bytes, None))
        .await
        .map_err(|e| AudioError::DecodeError(format!("decode task failed: {}", e)))?
}

/// Creates backends on demand, so construction can wait for `initialize()`
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn AudioBackend>>;
}

/// Backend without an output device
///
/// Used for offline rendering and tests: time comes from the injected
/// clock and resume completes immediately.
pub struct HeadlessBackend {
    sample_rate: u32,
    clock: Arc<dyn Clock>,
    state: AtomicU8,
}

impl HeadlessBackend {
    pub fn new(sample_rate: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            sample_rate,
            clock,
            state: AtomicU8::new(ContextState::Suspended.to_u8()),
        }
    }

    fn set_state(&self, state: ContextState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioBackend for HeadlessBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn resume(&self) -> Result<()> {
        match self.state() {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                self.set_state(ContextState::Running);
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        self.set_state(ContextState::Closed);
        Ok(())
    }

    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        decode_off_thread(bytes).await
    }
}

/// Factory for `HeadlessBackend`
pub struct HeadlessBackendFactory {
    sample_rate: u32,
    clock: Arc<dyn Clock>,
}

impl HeadlessBackendFactory {
    pub fn new(sample_rate: u32, clock: Arc<dyn Clock>) -> Self {
        Self { sample_rate, clock }
    }
}

impl BackendFactory for HeadlessBackendFactory {
    fn create(&self) -> Result<Box<dyn AudioBackend>> {
        if self.sample_rate == 0 {
            return Err(AudioError::BackendUnavailable(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(Box::new(HeadlessBackend::new(
            self.sample_rate,
            Arc::clone(&self.clock),
        )))
    }
}
