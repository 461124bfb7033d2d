//! Audio processing graph
//!
//! Fixed signal path, built on `initialize()`:
//!
//! ```text
//! source -> preamp -> equalizer (10 bands) -> limiter -> master gain -> analyser -> output
//! ```
//!
//! Parameters (volume, mute, preamp, equalizer and limiter settings) live
//! outside the nodes, so they can be set before the graph exists and survive
//! `destroy()`. Every change applies from the next rendered sample.

use crate::analyser::Analyser;
use crate::backend::{AudioBackend, ContextState};
use crate::buffer::DecodedAudio;
use crate::equalizer::Equalizer;
use crate::error::{AudioError, Result};
use crate::limiter::Limiter;
use std::sync::Arc;

pub const DEFAULT_VOLUME: f32 = 0.8;
pub const MIN_PREAMP_DB: f32 = -12.0;
pub const MAX_PREAMP_DB: f32 = 12.0;

/// Default rate used to tune filters before a backend exists
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Buffer playback node; one-shot, replaced on every start
struct SourceNode {
    buffer: Arc<DecodedAudio>,
    /// Read position in source frames
    cursor: f64,
    /// Context time when the node started
    started_at: f64,
    /// Buffer offset (seconds) the node started from
    offset: f64,
    exhausted: bool,
}

impl SourceNode {
    /// Linearly interpolated stereo frame at the cursor
    #[inline]
    fn read(&self) -> (f32, f32) {
        let index = self.cursor.floor() as usize;
        let frac = (self.cursor - self.cursor.floor()) as f32;
        let (l0, r0) = self.buffer.stereo_frame(index);
        if frac == 0.0 {
            return (l0, r0);
        }
        let (l1, r1) = self.buffer.stereo_frame(index + 1);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

struct GraphNodes {
    backend: Box<dyn AudioBackend>,
    analyser: Analyser,
    source: Option<SourceNode>,
    /// Reused block for `pump`
    scratch: Vec<f32>,
}

pub struct AudioGraph {
    volume: f32,
    muted: bool,
    preamp_db: f32,
    equalizer: Equalizer,
    limiter: Limiter,
    nodes: Option<GraphNodes>,
}

impl AudioGraph {
    pub fn new() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
            preamp_db: 0.0,
            equalizer: Equalizer::new(FALLBACK_SAMPLE_RATE),
            limiter: Limiter::new(FALLBACK_SAMPLE_RATE),
            nodes: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.nodes.is_some()
    }

    /// Build the node chain on top of `backend`
    ///
    /// A second call keeps the existing chain and drops `backend`.
    pub fn initialize(&mut self, backend: Box<dyn AudioBackend>) {
        if self.nodes.is_some() {
            tracing::debug!("audio graph already initialized");
            return;
        }

        let sample_rate = backend.sample_rate();
        self.equalizer.set_sample_rate(sample_rate);
        self.limiter.set_sample_rate(sample_rate);
        self.limiter.reset();

        self.nodes = Some(GraphNodes {
            backend,
            analyser: Analyser::new(),
            source: None,
            scratch: Vec::new(),
        });
        tracing::info!(sample_rate, "audio graph initialized");
    }

    fn nodes(&self) -> Result<&GraphNodes> {
        self.nodes.as_ref().ok_or(AudioError::NotInitialized)
    }

    // ===== Context =====

    pub fn sample_rate(&self) -> Option<u32> {
        self.nodes.as_ref().map(|n| n.backend.sample_rate())
    }

    /// Context clock in seconds, 0 before initialization
    pub fn current_time(&self) -> f64 {
        self.nodes
            .as_ref()
            .map(|n| n.backend.current_time())
            .unwrap_or(0.0)
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.nodes.as_ref().map(|n| n.backend.state())
    }

    /// Request the context to start running
    pub fn resume(&self) -> Result<()> {
        self.nodes()?.backend.resume()
    }

    /// Decode through the platform decoder
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio> {
        self.nodes()?.backend.decode(bytes).await
    }

    // ===== Gain stages =====

    /// Set master volume, clamped to [0, 1]. Unmutes.
    pub fn set_master_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            tracing::warn!(volume, "ignoring non-finite volume");
            return;
        }
        let clamped = volume.clamp(0.0, 1.0);
        if clamped != volume {
            tracing::debug!(requested = volume, applied = clamped, "volume clamped");
        }
        self.volume = clamped;
        self.muted = false;
    }

    /// Volume level, kept while muted so unmuting restores it
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Gain actually applied at the master stage
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Set preamp gain, clamped to ±12 dB
    pub fn set_preamp_db(&mut self, db: f32) {
        if !db.is_finite() {
            tracing::warn!(db, "ignoring non-finite preamp gain");
            return;
        }
        self.preamp_db = db.clamp(MIN_PREAMP_DB, MAX_PREAMP_DB);
    }

    pub fn preamp_db(&self) -> f32 {
        self.preamp_db
    }

    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    pub fn equalizer_mut(&mut self) -> &mut Equalizer {
        &mut self.equalizer
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    pub fn limiter_mut(&mut self) -> &mut Limiter {
        &mut self.limiter
    }

    // ===== Analysis tap =====

    /// Byte spectrum, empty before initialization
    pub fn frequency_data(&mut self) -> Vec<u8> {
        self.nodes
            .as_mut()
            .map(|n| n.analyser.frequency_data())
            .unwrap_or_default()
    }

    /// Byte waveform, empty before initialization
    pub fn waveform_data(&self) -> Vec<u8> {
        self.nodes
            .as_ref()
            .map(|n| n.analyser.waveform_data())
            .unwrap_or_default()
    }

    // ===== Source =====

    /// Start a fresh source node at `offset` seconds into `buffer`
    pub fn start_source(&mut self, buffer: Arc<DecodedAudio>, offset: f64) -> Result<()> {
        let nodes = self.nodes.as_mut().ok_or(AudioError::NotInitialized)?;
        let offset = offset.clamp(0.0, buffer.duration());
        nodes.source = Some(SourceNode {
            cursor: offset * f64::from(buffer.sample_rate()),
            started_at: nodes.backend.current_time(),
            offset,
            exhausted: false,
            buffer,
        });
        self.equalizer.reset_state();
        Ok(())
    }

    /// Stop and discard the source node, if any
    pub fn stop_source(&mut self) {
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.source = None;
        }
    }

    /// Whether the current source has played to its end
    ///
    /// True once rendering consumed the last frame or the context clock
    /// passed the scheduled end time, whichever comes first.
    pub fn source_ended(&self) -> bool {
        let Some(nodes) = self.nodes.as_ref() else {
            return false;
        };
        let Some(source) = nodes.source.as_ref() else {
            return false;
        };
        let end_time = source.started_at + (source.buffer.duration() - source.offset);
        source.exhausted || nodes.backend.current_time() >= end_time
    }

    // ===== Rendering =====

    /// Pull interleaved stereo output; returns frames written
    ///
    /// Writes silence while the graph is uninitialized or the context is not
    /// running.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len() / 2;
        let Some(nodes) = self.nodes.as_mut() else {
            out.fill(0.0);
            return frames;
        };
        if nodes.backend.state() != ContextState::Running {
            out.fill(0.0);
            return frames;
        }

        let out_rate = f64::from(nodes.backend.sample_rate().max(1));
        let preamp = 10.0_f32.powf(self.preamp_db / 20.0);
        let master = if self.muted { 0.0 } else { self.volume };

        for frame in out.chunks_exact_mut(2) {
            let (mut l, mut r) = match nodes.source.as_mut() {
                Some(source) if !source.exhausted => {
                    let sample = source.read();
                    source.cursor += f64::from(source.buffer.sample_rate()) / out_rate;
                    if source.cursor >= source.buffer.frames() as f64 {
                        source.exhausted = true;
                    }
                    sample
                }
                _ => (0.0, 0.0),
            };

            l *= preamp;
            r *= preamp;
            (l, r) = self.equalizer.process(l, r);
            (l, r) = self.limiter.process(l, r);
            l *= master;
            r *= master;

            nodes.analyser.push((l + r) * 0.5);
            frame[0] = l;
            frame[1] = r;
        }

        frames
    }

    /// Render whatever the backend's output device can take right now
    ///
    /// Returns frames delivered. Backends without a device never ask for
    /// any, so this is a no-op for offline rendering.
    pub fn pump(&mut self) -> usize {
        let demand = match self.nodes.as_ref() {
            Some(nodes) if nodes.backend.state() == ContextState::Running => {
                nodes.backend.output_demand()
            }
            _ => 0,
        };
        if demand == 0 {
            return 0;
        }

        let mut block = self
            .nodes
            .as_mut()
            .map(|n| std::mem::take(&mut n.scratch))
            .unwrap_or_default();
        block.resize(demand * 2, 0.0);
        let frames = self.render(&mut block);

        let Some(nodes) = self.nodes.as_mut() else {
            return 0;
        };
        let delivered = nodes.backend.write_output(&block[..frames * 2]);
        nodes.scratch = block;
        delivered
    }

    /// Tear down every node and close the context
    ///
    /// Safe to call repeatedly. Close errors are swallowed.
    pub fn destroy(&mut self) {
        let Some(nodes) = self.nodes.take() else {
            return;
        };
        if let Err(e) = nodes.backend.close() {
            tracing::debug!(error = %e, "ignoring error while closing audio context");
        }
        self.equalizer.reset_state();
        self.limiter.reset();
        tracing::info!("audio graph destroyed");
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}
