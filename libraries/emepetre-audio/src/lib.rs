//! Emepetre Audio
//!
//! The signal path of the player and the platform seams it runs on.
//!
//! This crate provides:
//! - `AudioGraph`: source, preamp, 10-band equalizer, limiter, master gain
//!   and analyser, wired in a fixed order and built lazily
//! - `Equalizer` with presets and frequency-response queries
//! - `Limiter`: soft-knee peak limiter with a gain-reduction meter
//! - `Analyser`: FFT and waveform snapshots for visualisers
//! - `AudioBackend` / `BackendFactory`: the platform audio context, with a
//!   device-less `HeadlessBackend` and, with the `device` feature, a cpal
//!   `CpalBackend` fed through an `OutputRing`
//! - `Clock`: injectable time source (`SystemClock`, `ManualClock`)
//! - `SymphoniaDecoder`: in-memory decoding (MP3, FLAC, OGG, WAV, AAC)
//!
//! # Example: Rendering offline
//!
//! ```rust
//! use emepetre_audio::{AudioGraph, DecodedAudio, HeadlessBackend, ManualClock};
//! use std::sync::Arc;
//!
//! let clock = ManualClock::new();
//! let mut graph = AudioGraph::new();
//! graph.initialize(Box::new(HeadlessBackend::new(44100, Arc::new(clock.clone()))));
//! graph.resume().unwrap();
//!
//! graph.equalizer_mut().set_band_gain(0, 6.0);
//! let tone = Arc::new(DecodedAudio::sine(440.0, 0.5, 1.0, 44100).unwrap());
//! graph.start_source(tone, 0.0).unwrap();
//!
//! let mut block = vec![0.0f32; 2 * 512];
//! graph.render(&mut block);
//! clock.advance(512.0 / 44100.0);
//! ```

mod analyser;
mod backend;
mod buffer;
mod clock;
mod decoder;
#[cfg(feature = "device")]
mod device;
pub mod equalizer;
mod error;
mod graph;
pub mod limiter;
mod output;

pub use analyser::{Analyser, FFT_SIZE};
pub use backend::{AudioBackend, BackendFactory, ContextState, HeadlessBackend, HeadlessBackendFactory};
pub use buffer::DecodedAudio;
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::SymphoniaDecoder;
#[cfg(feature = "device")]
pub use device::{CpalBackend, CpalBackendFactory, DEFAULT_OUTPUT_LATENCY};
pub use equalizer::{EqPreset, Equalizer, FrequencyResponse, EQ_BAND_COUNT, EQ_FREQUENCIES};
pub use error::{AudioError, Result};
pub use graph::{AudioGraph, DEFAULT_VOLUME};
pub use limiter::{Limiter, LimiterSettings};
pub use output::OutputRing;
