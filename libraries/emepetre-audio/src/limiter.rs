/// Soft limiter
///
/// A dynamics compressor with fixed topology, tuned to catch the peaks an
/// aggressive equalizer boost produces. Always present in the graph.
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD_DB: f32 = -3.0;
pub const DEFAULT_KNEE_DB: f32 = 6.0;
pub const DEFAULT_RATIO: f32 = 12.0;
pub const DEFAULT_ATTACK_SECS: f32 = 0.003;
pub const DEFAULT_RELEASE_SECS: f32 = 0.15;

const THRESHOLD_RANGE: (f32, f32) = (-50.0, 0.0);
const KNEE_RANGE: (f32, f32) = (0.0, 40.0);
const RATIO_RANGE: (f32, f32) = (1.0, 20.0);

/// Hold time of the peak detector
const PEAK_RELEASE_SECS: f32 = 0.05;
const NOISE_FLOOR_DB: f32 = -120.0;

/// Limiter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Threshold in dB (-50 to 0)
    pub threshold_db: f32,
    /// Knee width in dB (0 to 40)
    pub knee_db: f32,
    /// Ratio (1 to 20)
    pub ratio: f32,
    /// Attack in seconds
    pub attack_secs: f32,
    /// Release in seconds
    pub release_secs: f32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            knee_db: DEFAULT_KNEE_DB,
            ratio: DEFAULT_RATIO,
            attack_secs: DEFAULT_ATTACK_SECS,
            release_secs: DEFAULT_RELEASE_SECS,
        }
    }
}

/// Peak-detecting soft-knee limiter
pub struct Limiter {
    settings: LimiterSettings,
    sample_rate: u32,

    peak_level_db: f32,
    // Smoothed gain reduction, <= 0
    gain_reduction_db: f32,

    peak_release_coeff: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl Limiter {
    pub fn new(sample_rate: u32) -> Self {
        let mut limiter = Self {
            settings: LimiterSettings::default(),
            sample_rate,
            peak_level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
            peak_release_coeff: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
        };
        limiter.update_coefficients();
        limiter
    }

    pub fn settings(&self) -> LimiterSettings {
        self.settings
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        if let Some(v) = clamp_param("threshold", threshold_db, THRESHOLD_RANGE) {
            self.settings.threshold_db = v;
        }
    }

    pub fn set_knee(&mut self, knee_db: f32) {
        if let Some(v) = clamp_param("knee", knee_db, KNEE_RANGE) {
            self.settings.knee_db = v;
        }
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        if let Some(v) = clamp_param("ratio", ratio, RATIO_RANGE) {
            self.settings.ratio = v;
        }
    }

    /// Current gain reduction in dB (0 when idle, negative while limiting)
    pub fn current_reduction(&self) -> f32 {
        self.gain_reduction_db
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.update_coefficients();
        }
    }

    /// Clear detector state
    pub fn reset(&mut self) {
        self.peak_level_db = NOISE_FLOOR_DB;
        self.gain_reduction_db = 0.0;
    }

    fn update_coefficients(&mut self) {
        let sr = self.sample_rate.max(1) as f32;
        // coeff = exp(-1 / (time * sample_rate)): 63% of the way in `time`
        self.peak_release_coeff = (-1.0 / (PEAK_RELEASE_SECS * sr)).exp();
        self.attack_coeff = (-1.0 / (self.settings.attack_secs * sr)).exp();
        self.release_coeff = (-1.0 / (self.settings.release_secs * sr)).exp();
    }

    /// Static curve: output level for an input level, both in dB
    #[inline]
    fn output_level(&self, input_db: f32) -> f32 {
        let LimiterSettings {
            threshold_db: threshold,
            knee_db: knee,
            ratio,
            ..
        } = self.settings;

        if knee <= 0.0 {
            return if input_db <= threshold {
                input_db
            } else {
                threshold + (input_db - threshold) / ratio
            };
        }

        let knee_start = threshold - knee / 2.0;
        let knee_end = threshold + knee / 2.0;
        if input_db <= knee_start {
            input_db
        } else if input_db >= knee_end {
            threshold + (input_db - threshold) / ratio
        } else {
            let x = input_db - knee_start;
            input_db - (1.0 - 1.0 / ratio) / (2.0 * knee) * x * x
        }
    }

    /// Limit one stereo frame (linked detection)
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        let input_db = if peak > 1e-6 {
            20.0 * peak.log10()
        } else {
            NOISE_FLOOR_DB
        };

        if input_db > self.peak_level_db {
            self.peak_level_db = input_db;
        } else {
            self.peak_level_db =
                self.peak_release_coeff * (self.peak_level_db - NOISE_FLOOR_DB) + NOISE_FLOOR_DB;
        }

        let target = self.output_level(self.peak_level_db) - self.peak_level_db;
        let coeff = if target < self.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain_reduction_db = coeff * self.gain_reduction_db + (1.0 - coeff) * target;

        let gain = 10.0_f32.powf(self.gain_reduction_db / 20.0);
        (left * gain, right * gain)
    }
}

fn clamp_param(name: &str, value: f32, (min, max): (f32, f32)) -> Option<f32> {
    if !value.is_finite() {
        tracing::warn!(param = name, value, "ignoring non-finite limiter parameter");
        return None;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::debug!(param = name, requested = value, applied = clamped, "limiter parameter clamped");
    }
    Some(clamped)
}
