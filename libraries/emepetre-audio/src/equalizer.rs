//! 10-band Equalizer
//!
//! Ten peaking filters in series at fixed octave frequencies:
//! - Shared Q of 1.4
//! - Per-band gain control (-12 to +12 dB), clamped
//! - Presets
//! - Compound frequency response for visualisation
//!
//! Gain changes take effect on the next processed sample. There is no
//! coefficient smoothing; the limiter downstream absorbs the transient.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Band centre frequencies (Hz)
pub const EQ_FREQUENCIES: [f32; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

pub const EQ_BAND_COUNT: usize = EQ_FREQUENCIES.len();

/// Q shared by every band
pub const EQ_Q: f32 = 1.4;

pub const MIN_GAIN_DB: f32 = -12.0;
pub const MAX_GAIN_DB: f32 = 12.0;

/// Built-in equalizer presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqPreset {
    #[default]
    Flat,
    Rock,
    Pop,
    Classical,
    BassBoost,
    Vocal,
    Electronic,
    Jazz,
}

impl EqPreset {
    pub const ALL: [EqPreset; 8] = [
        Self::Flat,
        Self::Rock,
        Self::Pop,
        Self::Classical,
        Self::BassBoost,
        Self::Vocal,
        Self::Electronic,
        Self::Jazz,
    ];

    /// Band gains in dB
    pub fn gains(&self) -> [f32; EQ_BAND_COUNT] {
        match self {
            Self::Flat => [0.0; EQ_BAND_COUNT],
            Self::Rock => [4.0, 3.0, 2.0, 1.0, -1.0, -1.0, 1.0, 2.0, 3.0, 4.0],
            Self::Pop => [-1.0, 1.0, 3.0, 4.0, 3.0, 1.0, -1.0, -2.0, -1.0, 1.0],
            Self::Classical => [3.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0],
            Self::BassBoost => [6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            Self::Vocal => [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 3.0, 1.0, 0.0, -1.0],
            Self::Electronic => [4.0, 3.0, 1.0, 0.0, -2.0, 1.0, 0.0, 2.0, 4.0, 5.0],
            Self::Jazz => [2.0, 1.0, 0.0, 2.0, -2.0, -2.0, 0.0, 1.0, 2.0, 3.0],
        }
    }

    /// Preamp in dB applied together with the band gains
    pub fn preamp_db(&self) -> f32 {
        match self {
            Self::Rock | Self::Classical | Self::Electronic => -1.0,
            Self::BassBoost => -2.0,
            Self::Flat | Self::Pop | Self::Vocal | Self::Jazz => 0.0,
        }
    }

    /// Stable identifier, as used in configuration
    pub fn id(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Rock => "rock",
            Self::Pop => "pop",
            Self::Classical => "classical",
            Self::BassBoost => "bass-boost",
            Self::Vocal => "vocal",
            Self::Electronic => "electronic",
            Self::Jazz => "jazz",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::Rock => "Rock",
            Self::Pop => "Pop",
            Self::Classical => "Classical",
            Self::BassBoost => "Bass Boost",
            Self::Vocal => "Vocal",
            Self::Electronic => "Electronic",
            Self::Jazz => "Jazz",
        }
    }
}

impl fmt::Display for EqPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EqPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown equalizer preset: {}", s))
    }
}

/// Compound response of the filter bank, one entry per queried frequency
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResponse {
    /// Linear magnitude (product over all bands)
    pub magnitudes: Vec<f32>,
    /// Phase in radians (sum over all bands)
    pub phases: Vec<f32>,
}

/// Peaking biquad (RBJ cookbook), stereo state
#[derive(Debug, Clone)]
struct PeakingBand {
    frequency: f32,
    gain_db: f32,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    x1_l: f64,
    x2_l: f64,
    y1_l: f64,
    y2_l: f64,
    x1_r: f64,
    x2_r: f64,
    y1_r: f64,
    y2_r: f64,
}

impl PeakingBand {
    fn new(frequency: f32, sample_rate: u32) -> Self {
        let mut band = Self {
            frequency,
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1_l: 0.0,
            x2_l: 0.0,
            y1_l: 0.0,
            y2_l: 0.0,
            x1_r: 0.0,
            x2_r: 0.0,
            y1_r: 0.0,
            y2_r: 0.0,
        };
        band.update_coefficients(sample_rate);
        band
    }

    fn update_coefficients(&mut self, sample_rate: u32) {
        let sr = f64::from(sample_rate);
        if sr < 1.0 {
            return;
        }

        let a = 10.0_f64.powf(f64::from(self.gain_db) / 40.0);
        // Keep clear of Nyquist at low output rates
        let freq = f64::from(self.frequency).min(sr * 0.45);
        let omega = 2.0 * PI * freq / sr;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * f64::from(EQ_Q));

        let a0 = 1.0 + alpha / a;
        self.b0 = (1.0 + alpha * a) / a0;
        self.b1 = (-2.0 * cos_omega) / a0;
        self.b2 = (1.0 - alpha * a) / a0;
        self.a1 = (-2.0 * cos_omega) / a0;
        self.a2 = (1.0 - alpha / a) / a0;
    }

    #[inline]
    fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let l = f64::from(left);
        let mut out_l =
            self.b0 * l + self.b1 * self.x1_l + self.b2 * self.x2_l - self.a1 * self.y1_l - self.a2 * self.y2_l;
        // Flush denormals
        if out_l.abs() < 1e-15 {
            out_l = 0.0;
        }
        self.x2_l = self.x1_l;
        self.x1_l = l;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let r = f64::from(right);
        let mut out_r =
            self.b0 * r + self.b1 * self.x1_r + self.b2 * self.x2_r - self.a1 * self.y1_r - self.a2 * self.y2_r;
        if out_r.abs() < 1e-15 {
            out_r = 0.0;
        }
        self.x2_r = self.x1_r;
        self.x1_r = r;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l as f32, out_r as f32)
    }

    /// H(e^jw) at normalised angular frequency `omega`
    fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = Complex::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let den = Complex::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    fn reset(&mut self) {
        self.x1_l = 0.0;
        self.x2_l = 0.0;
        self.y1_l = 0.0;
        self.y2_l = 0.0;
        self.x1_r = 0.0;
        self.x2_r = 0.0;
        self.y1_r = 0.0;
        self.y2_r = 0.0;
    }
}

/// Ten peaking filters in series
#[derive(Debug, Clone)]
pub struct Equalizer {
    bands: Vec<PeakingBand>,
    sample_rate: u32,
}

impl Equalizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            bands: EQ_FREQUENCIES
                .iter()
                .map(|&freq| PeakingBand::new(freq, sample_rate))
                .collect(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Retune every band for a new output rate and clear filter state
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        for band in &mut self.bands {
            band.update_coefficients(sample_rate);
            band.reset();
        }
    }

    /// Gain of one band in dB
    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|b| b.gain_db)
    }

    /// All band gains in dB
    pub fn gains(&self) -> [f32; EQ_BAND_COUNT] {
        let mut gains = [0.0; EQ_BAND_COUNT];
        for (gain, band) in gains.iter_mut().zip(&self.bands) {
            *gain = band.gain_db;
        }
        gains
    }

    /// Set one band, clamping to ±12 dB
    ///
    /// An out-of-range index or a non-finite gain leaves the bank untouched.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        if !gain_db.is_finite() {
            tracing::warn!(index, gain_db, "ignoring non-finite equalizer gain");
            return;
        }
        let sample_rate = self.sample_rate;
        let Some(band) = self.bands.get_mut(index) else {
            tracing::warn!(index, "equalizer band index out of range");
            return;
        };
        band.gain_db = clamp_gain(gain_db);
        band.update_coefficients(sample_rate);
    }

    /// Set all ten bands at once
    ///
    /// Rejected as a whole when the slice is not exactly ten gains long or
    /// contains a non-finite value.
    pub fn set_all_bands(&mut self, gains: &[f32]) {
        if gains.len() != EQ_BAND_COUNT {
            tracing::warn!(
                expected = EQ_BAND_COUNT,
                got = gains.len(),
                "rejecting equalizer gains of wrong length"
            );
            return;
        }
        if gains.iter().any(|g| !g.is_finite()) {
            tracing::warn!("rejecting equalizer gains with non-finite values");
            return;
        }
        let sample_rate = self.sample_rate;
        for (band, &gain) in self.bands.iter_mut().zip(gains) {
            band.gain_db = clamp_gain(gain);
            band.update_coefficients(sample_rate);
        }
    }

    /// Set every band to 0 dB
    pub fn reset(&mut self) {
        self.set_all_bands(&[0.0; EQ_BAND_COUNT]);
    }

    pub fn apply_preset(&mut self, preset: EqPreset) {
        self.set_all_bands(&preset.gains());
    }

    /// Compound magnitude and phase at each frequency (Hz)
    ///
    /// Frequencies outside `[0, nyquist]` yield NaN, as there is no
    /// meaningful response there.
    pub fn frequency_response(&self, frequencies: &[f32]) -> FrequencyResponse {
        let sr = f64::from(self.sample_rate);
        let nyquist = sr / 2.0;
        let mut magnitudes = Vec::with_capacity(frequencies.len());
        let mut phases = Vec::with_capacity(frequencies.len());

        for &freq in frequencies {
            let f = f64::from(freq);
            if !f.is_finite() || f < 0.0 || f > nyquist {
                magnitudes.push(f32::NAN);
                phases.push(f32::NAN);
                continue;
            }

            let omega = 2.0 * PI * f / sr;
            let (magnitude, phase) = self.bands.iter().fold((1.0_f64, 0.0_f64), |(m, p), band| {
                let h = band.response(omega);
                (m * h.norm(), p + h.arg())
            });
            magnitudes.push(magnitude as f32);
            phases.push(phase as f32);
        }

        FrequencyResponse { magnitudes, phases }
    }

    /// Run one stereo frame through every band
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.bands
            .iter_mut()
            .fold((left, right), |(l, r), band| band.process(l, r))
    }

    /// Clear filter history (seek, track change)
    pub fn reset_state(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }
}

fn clamp_gain(gain_db: f32) -> f32 {
    let clamped = gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB);
    if clamped != gain_db {
        tracing::debug!(requested = gain_db, applied = clamped, "equalizer gain clamped");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(linear: f32) -> f32 {
        20.0 * linear.log10()
    }

    #[test]
    fn flat_bank_has_unity_response() {
        let eq = Equalizer::new(48000);
        let response = eq.frequency_response(&[20.0, 1000.0, 15000.0]);
        for m in &response.magnitudes {
            assert!((m - 1.0).abs() < 1e-4, "magnitude {m}");
        }
        for p in &response.phases {
            assert!(p.abs() < 1e-4);
        }
    }

    #[test]
    fn boosted_band_peaks_at_its_centre() {
        let mut eq = Equalizer::new(48000);
        eq.set_band_gain(5, 12.0);

        let response = eq.frequency_response(&[1000.0, 100.0]);
        assert!((db(response.magnitudes[0]) - 12.0).abs() < 0.1);
        assert!(db(response.magnitudes[1]).abs() < 1.0);
    }

    #[test]
    fn magnitudes_multiply_across_bands() {
        let mut eq = Equalizer::new(48000);
        eq.set_band_gain(4, 6.0);
        eq.set_band_gain(6, 6.0);

        let mut only_500 = Equalizer::new(48000);
        only_500.set_band_gain(4, 6.0);
        let mut only_2k = Equalizer::new(48000);
        only_2k.set_band_gain(6, 6.0);

        let f = [1000.0];
        let combined = eq.frequency_response(&f).magnitudes[0];
        let product = only_500.frequency_response(&f).magnitudes[0]
            * only_2k.frequency_response(&f).magnitudes[0];
        assert!((combined - product).abs() < 1e-4);
    }

    #[test]
    fn out_of_range_frequency_is_nan() {
        let eq = Equalizer::new(44100);
        let response = eq.frequency_response(&[-1.0, 30000.0]);
        assert!(response.magnitudes.iter().all(|m| m.is_nan()));
        assert!(response.phases.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn gains_are_clamped() {
        let mut eq = Equalizer::new(44100);
        eq.set_band_gain(0, 40.0);
        eq.set_band_gain(9, -99.0);
        assert_eq!(eq.band_gain(0), Some(12.0));
        assert_eq!(eq.band_gain(9), Some(-12.0));
    }

    #[test]
    fn bad_index_is_a_no_op() {
        let mut eq = Equalizer::new(44100);
        eq.set_band_gain(10, 3.0);
        assert_eq!(eq.gains(), [0.0; 10]);
    }

    #[test]
    fn wrong_length_is_rejected_whole() {
        let mut eq = Equalizer::new(44100);
        eq.apply_preset(EqPreset::Rock);
        let before = eq.gains();

        eq.set_all_bands(&[1.0, 2.0, 3.0]);
        assert_eq!(eq.gains(), before);

        let mut with_nan = [1.0; 10];
        with_nan[3] = f32::NAN;
        eq.set_all_bands(&with_nan);
        assert_eq!(eq.gains(), before);
    }

    #[test]
    fn reset_flattens() {
        let mut eq = Equalizer::new(44100);
        eq.apply_preset(EqPreset::BassBoost);
        eq.reset();
        assert_eq!(eq.gains(), [0.0; 10]);
    }

    #[test]
    fn presets_parse_by_id() {
        for preset in EqPreset::ALL {
            assert_eq!(preset.id().parse::<EqPreset>(), Ok(preset));
        }
        assert!("polka".parse::<EqPreset>().is_err());
        assert_eq!(EqPreset::BassBoost.preamp_db(), -2.0);
    }

    #[test]
    fn flat_processing_is_transparent() {
        let mut eq = Equalizer::new(44100);
        for i in 0..256 {
            let x = (i as f32 * 0.1).sin() * 0.5;
            let (l, r) = eq.process(x, -x);
            assert!((l - x).abs() < 1e-5);
            assert!((r + x).abs() < 1e-5);
        }
    }
}
