//! Playback through the default system output device (cpal)
//!
//! The cpal stream is not `Send` on every platform, so it lives on a
//! dedicated thread driven over a command channel. Its callback drains an
//! `OutputRing` that the graph fills, and the frames the device has played
//! are the context clock.

use crate::backend::{decode_off_thread, AudioBackend, BackendFactory, ContextState};
use crate::buffer::DecodedAudio;
use crate::error::{AudioError, Result};
use crate::output::OutputRing;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Rendered audio kept ahead of the device
pub const DEFAULT_OUTPUT_LATENCY: Duration = Duration::from_millis(80);

/// Commands sent to the stream thread
enum StreamCommand {
    Play,
    Shutdown,
}

pub struct CpalBackend {
    ring: Arc<OutputRing>,
    state: AtomicU8,
    commands: Sender<StreamCommand>,
}

impl CpalBackend {
    fn set_state(&self, state: ContextState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }

    /// Callbacks that found no rendered audio waiting
    pub fn underruns(&self) -> u64 {
        self.ring.underruns()
    }
}

#[async_trait]
impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> u32 {
        self.ring.sample_rate()
    }

    fn current_time(&self) -> f64 {
        self.ring.seconds_played()
    }

    fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn resume(&self) -> Result<()> {
        match self.state() {
            ContextState::Closed => Err(AudioError::ContextClosed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.commands.send(StreamCommand::Play).map_err(|_| {
                    AudioError::BackendUnavailable("output thread has stopped".to_string())
                })?;
                self.set_state(ContextState::Running);
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        if self.state() == ContextState::Closed {
            return Ok(());
        }
        self.set_state(ContextState::Closed);
        if self.commands.send(StreamCommand::Shutdown).is_err() {
            tracing::debug!("output thread already gone");
        }
        Ok(())
    }

    fn output_demand(&self) -> usize {
        self.ring.demand()
    }

    fn write_output(&self, samples: &[f32]) -> usize {
        self.ring.push(samples)
    }

    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        decode_off_thread(bytes).await
    }
}

/// Opens the default output device on every `create()`
#[derive(Debug, Clone)]
pub struct CpalBackendFactory {
    latency: Duration,
}

impl CpalBackendFactory {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for CpalBackendFactory {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LATENCY)
    }
}

impl BackendFactory for CpalBackendFactory {
    fn create(&self) -> Result<Box<dyn AudioBackend>> {
        let (command_tx, command_rx) = bounded::<StreamCommand>(32);
        let (ready_tx, ready_rx) = bounded::<Result<Arc<OutputRing>>>(1);
        let latency = self.latency;

        thread::Builder::new()
            .name("emepetre-output".to_string())
            .spawn(move || run_stream(latency, ready_tx, command_rx))
            .map_err(|e| {
                AudioError::BackendUnavailable(format!("failed to spawn output thread: {}", e))
            })?;

        let ring = ready_rx.recv().map_err(|_| {
            AudioError::BackendUnavailable("output thread exited during setup".to_string())
        })??;

        Ok(Box::new(CpalBackend {
            ring,
            state: AtomicU8::new(ContextState::Suspended.to_u8()),
            commands: command_tx,
        }))
    }
}

/// Stream thread: owns the cpal stream until shutdown or until the backend
/// is dropped
fn run_stream(
    latency: Duration,
    ready: Sender<Result<Arc<OutputRing>>>,
    commands: Receiver<StreamCommand>,
) {
    let stream = match open_stream(latency) {
        Ok((stream, ring)) => {
            if ready.send(Ok(ring)).is_err() {
                return;
            }
            stream
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to open output device");
            if ready.send(Err(e)).is_err() {
                tracing::debug!("output device requester went away");
            }
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play => {
                if let Err(e) = stream.play() {
                    tracing::error!(error = %e, "failed to start output stream");
                }
            }
            StreamCommand::Shutdown => break,
        }
    }

    drop(stream);
    tracing::debug!("output stream closed");
}

fn open_stream(latency: Duration) -> Result<(cpal::Stream, Arc<OutputRing>)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::BackendUnavailable("no output device".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::BackendUnavailable(e.to_string()))?;
    let sample_rate = supported.sample_rate();
    let config = supported.config();
    let channels = usize::from(config.channels);

    let capacity = (latency.as_secs_f64() * f64::from(sample_rate)).ceil() as usize;
    let ring = Arc::new(OutputRing::new(sample_rate, capacity));
    let callback_ring = Arc::clone(&ring);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                callback_ring.fill(data, channels);
            },
            |err| tracing::error!(error = %err, "output stream error"),
            None,
        )
        .map_err(|e| AudioError::BackendUnavailable(e.to_string()))?;

    // Some hosts start a stream as soon as it is built
    if let Err(e) = stream.pause() {
        tracing::debug!(error = %e, "output stream cannot pause");
    }

    tracing::info!(sample_rate, channels, "output device opened");
    Ok((stream, ring))
}
