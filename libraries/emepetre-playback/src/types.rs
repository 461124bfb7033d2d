//! Core types for playback management

use crate::error::{PlaybackError, Result};
use emepetre_audio::EqPreset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the cycle off -> all -> one -> off
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "all" => Ok(Self::All),
            "one" => Ok(Self::One),
            other => Err(format!("unknown repeat mode: {}", other)),
        }
    }
}

/// Configuration for the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial volume (0.0 - 1.0, default: 0.8)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Start with shuffle on (default: false)
    #[serde(default)]
    pub shuffle: bool,

    /// Initial repeat mode (default: off)
    #[serde(default)]
    pub repeat: RepeatMode,

    /// Position reporting interval in milliseconds (default: 16, about one frame)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Pre-select the last persisted track at startup (default: true)
    #[serde(default = "default_resume_on_start")]
    pub resume_on_start: bool,

    /// Equalizer preset applied at startup (default: flat)
    #[serde(default)]
    pub equalizer_preset: EqPreset,

    /// Seed for reproducible shuffles; random when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    /// `previous()` restarts the track instead of going back past this many seconds
    #[serde(default = "default_previous_restart_threshold_secs")]
    pub previous_restart_threshold_secs: f64,
}

impl PlayerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::InvalidConfig(format!(
                "initial_volume must be within [0, 1], got {}",
                self.initial_volume
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "frame_interval_ms must be positive".to_string(),
            ));
        }
        if !self.previous_restart_threshold_secs.is_finite()
            || self.previous_restart_threshold_secs < 0.0
        {
            return Err(PlaybackError::InvalidConfig(
                "previous_restart_threshold_secs must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_initial_volume() -> f32 {
    emepetre_audio::DEFAULT_VOLUME
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_resume_on_start() -> bool {
    true
}

fn default_previous_restart_threshold_secs() -> f64 {
    3.0
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            shuffle: false,
            repeat: RepeatMode::Off,
            frame_interval_ms: default_frame_interval_ms(),
            resume_on_start: default_resume_on_start(),
            equalizer_preset: EqPreset::Flat,
            shuffle_seed: None,
            previous_restart_threshold_secs: default_previous_restart_threshold_secs(),
        }
    }
}
