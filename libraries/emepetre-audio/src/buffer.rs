//! Decoded audio held in memory

use crate::error::{AudioError, Result};

/// ITU-R BS.775 downmix coefficient for centre and surround channels
const DOWNMIX_COEFF: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// A fully decoded track: interleaved `f32` samples plus their format
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Wrap interleaved samples
    ///
    /// Fails if the format is degenerate or the sample count is not a
    /// whole number of frames.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(AudioError::InvalidBuffer("zero channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer("zero sample rate".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::InvalidBuffer(format!(
                "{} samples is not a multiple of {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Silent buffer of the given length
    pub fn silence(duration_secs: f64, channels: u16, sample_rate: u32) -> Result<Self> {
        let frames = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(
            vec![0.0; frames * channels as usize],
            channels,
            sample_rate,
        )
    }

    /// Stereo sine tone, handy for exercising the graph
    pub fn sine(frequency: f32, amplitude: f32, duration_secs: f64, sample_rate: u32) -> Result<Self> {
        let frames = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        let step = 2.0 * std::f32::consts::PI * frequency / sample_rate.max(1) as f32;
        let samples = (0..frames)
            .flat_map(|i| {
                let s = amplitude * (step * i as f32).sin();
                [s, s]
            })
            .collect();
        Self::new(samples, 2, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame `index` folded to stereo
    ///
    /// Mono is duplicated, 5.1 and wider layouts are downmixed, anything
    /// else keeps the first two channels. Out-of-range frames are silent.
    #[inline]
    pub fn stereo_frame(&self, index: usize) -> (f32, f32) {
        let ch = self.channels as usize;
        let start = index * ch;
        let Some(frame) = self.samples.get(start..start + ch) else {
            return (0.0, 0.0);
        };

        match ch {
            1 => (frame[0], frame[0]),
            2..=5 => (frame[0], frame[1]),
            _ => {
                // FL FR C LFE SL SR
                let centre = frame[2] * DOWNMIX_COEFF;
                let left = frame[0] + centre + frame[4] * DOWNMIX_COEFF;
                let right = frame[1] + centre + frame[5] * DOWNMIX_COEFF;
                (left, right)
            }
        }
    }
}
