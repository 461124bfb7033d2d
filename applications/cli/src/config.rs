/// CLI configuration
use anyhow::{Context, Result};
use emepetre_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given
const DEFAULT_CONFIG_FILE: &str = "emepetre.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Rate of the rendered WAV file
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames rendered per tick
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    /// Audio kept queued ahead of the output device
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_frames: default_block_frames(),
            latency_ms: default_latency_ms(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// Environment variables use the `EMEPETRE_` prefix and `__` between
    /// sections, e.g. `EMEPETRE_PLAYER__INITIAL_VOLUME=0.5`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("EMEPETRE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;
        if self.output.sample_rate == 0 {
            anyhow::bail!("output.sample_rate must be positive");
        }
        if self.output.block_frames == 0 {
            anyhow::bail!("output.block_frames must be positive");
        }
        if self.output.latency_ms == 0 {
            anyhow::bail!("output.latency_ms must be positive");
        }
        Ok(())
    }
}

impl OutputSettings {
    #[cfg_attr(not(feature = "device"), allow(dead_code))]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

// Default values
fn default_sample_rate() -> u32 {
    44100
}

fn default_block_frames() -> usize {
    1024
}

fn default_latency_ms() -> u64 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;
    use emepetre_audio::EqPreset;
    use emepetre_playback::RepeatMode;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.sample_rate, 44100);
        assert_eq!(config.output.latency(), Duration::from_millis(80));
        assert_eq!(config.player.initial_volume, 0.8);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[player]
repeat = "all"
initial_volume = 0.5
equalizer_preset = "vocal"

[output]
sample_rate = 48000
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.player.repeat, RepeatMode::All);
        assert_eq!(config.player.initial_volume, 0.5);
        assert_eq!(config.player.equalizer_preset, EqPreset::Vocal);
        assert_eq!(config.output.sample_rate, 48000);
        assert_eq!(config.player.frame_interval_ms, 16);
    }

    #[test]
    fn environment_overrides_output() {
        std::env::set_var("EMEPETRE_OUTPUT__BLOCK_FRAMES", "256");
        let config = CliConfig::load(None).unwrap();
        std::env::remove_var("EMEPETRE_OUTPUT__BLOCK_FRAMES");

        assert_eq!(config.output.block_frames, 256);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[player]\ninitial_volume = 3.0").unwrap();

        assert!(CliConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn zero_latency_is_rejected() {
        let mut config = CliConfig::default();
        config.output.latency_ms = 0;
        assert!(config.validate().is_err());
    }
}
