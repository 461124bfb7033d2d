//! Analysis tap
//!
//! Keeps the last `FFT_SIZE` output samples (mono mix) and turns them into
//! byte arrays for visualisers:
//! - frequency data: Blackman-windowed FFT magnitude, smoothed over calls,
//!   mapped from [-100, -30] dB onto 0..=255
//! - waveform data: samples mapped from [-1, 1] onto 0..=255 (silence = 128)

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const FFT_SIZE: usize = 2048;
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

pub struct Analyser {
    ring: Vec<f32>,
    write_pos: usize,
    smoothed: Vec<f32>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new() -> Self {
        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = 2.0 * PI * i as f32 / FFT_SIZE as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            ring: vec![0.0; FFT_SIZE],
            write_pos: 0,
            smoothed: vec![0.0; FFT_SIZE / 2],
            window,
            fft: FftPlanner::new().plan_fft_forward(FFT_SIZE),
            spectrum: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Number of frequency bins reported
    pub fn frequency_bin_count(&self) -> usize {
        FFT_SIZE / 2
    }

    /// Feed one output sample
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.ring[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % FFT_SIZE;
    }

    /// Latest `FFT_SIZE` samples, oldest first
    pub fn time_domain(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(FFT_SIZE);
        out.extend_from_slice(&self.ring[self.write_pos..]);
        out.extend_from_slice(&self.ring[..self.write_pos]);
        out
    }

    /// Waveform snapshot as bytes
    pub fn waveform_data(&self) -> Vec<u8> {
        self.time_domain()
            .into_iter()
            .map(|s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Spectrum snapshot as bytes; updates the smoothing state
    pub fn frequency_data(&mut self) -> Vec<u8> {
        let samples = self.time_domain();
        for ((bin, sample), w) in self
            .spectrum
            .iter_mut()
            .zip(samples)
            .zip(&self.window)
        {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        let mut out = Vec::with_capacity(self.smoothed.len());
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() / FFT_SIZE as f32;
            *smoothed = SMOOTHING_TIME_CONSTANT * *smoothed
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            let db = if *smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            out.push(scaled.clamp(0.0, 255.0) as u8);
        }
        out
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.smoothed.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_reads_as_midpoint_and_floor() {
        let mut analyser = Analyser::new();
        assert!(analyser.waveform_data().iter().all(|&b| b == 128));
        assert!(analyser.frequency_data().iter().all(|&b| b == 0));
        assert_eq!(analyser.frequency_data().len(), 1024);
    }

    #[test]
    fn tone_lights_up_its_bin() {
        let mut analyser = Analyser::new();
        // Bin 64 of a 2048-point FFT
        for i in 0..FFT_SIZE * 4 {
            analyser.push(0.01 * (2.0 * PI * 64.0 * i as f32 / FFT_SIZE as f32).sin());
        }
        // Let the smoothing settle
        let data = (0..21).map(|_| analyser.frequency_data()).last().unwrap();
        let peak = data
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
        assert!(data[64] > data[63] && data[64] > data[65]);
        assert!(data[64] > 100 && data[64] < 255);
    }

    #[test]
    fn spectrum_decays_once_the_tone_stops() {
        let mut analyser = Analyser::new();
        for i in 0..FFT_SIZE {
            analyser.push(0.5 * (2.0 * PI * 32.0 * i as f32 / FFT_SIZE as f32).sin());
        }
        let loud = analyser.frequency_data()[32];

        for _ in 0..FFT_SIZE {
            analyser.push(0.0);
        }
        let quiet = (0..10).map(|_| analyser.frequency_data()[32]).last().unwrap();

        assert!(loud > 0);
        assert!(quiet < loud);
    }

    #[test]
    fn time_domain_is_ordered_oldest_first() {
        let mut analyser = Analyser::new();
        for i in 0..FFT_SIZE + 3 {
            analyser.push(i as f32);
        }
        let td = analyser.time_domain();
        assert_eq!(td[0], 3.0);
        assert_eq!(td[FFT_SIZE - 1], (FFT_SIZE + 2) as f32);
    }
}
