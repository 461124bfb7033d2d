//! Emepetre command-line player
//!
//! Plays audio files through the playback core and writes the mixed result
//! to a WAV file. Builds with the `device` feature also play to the default
//! output device.

mod config;
mod media;
#[cfg(feature = "device")]
mod play;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::CliConfig;
use emepetre_audio::{EqPreset, Equalizer, EQ_FREQUENCIES};
use emepetre_playback::RepeatMode;
use render::RenderJob;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emepetre", version, about = "Emepetre command-line player")]
struct Cli {
    /// Configuration file (defaults to ./emepetre.toml when present)
    #[arg(long, global = true, env = "EMEPETRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play files in order and write the output to a WAV file
    Render {
        /// Audio files, in queue order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output WAV path
        #[arg(short, long, default_value = "emepetre-out.wav")]
        output: PathBuf,

        /// Equalizer preset (overrides the configured one)
        #[arg(long)]
        preset: Option<EqPreset>,

        /// Stop after this many seconds of output
        #[arg(long)]
        seconds: Option<f64>,

        /// Repeat mode: off, all or one
        #[arg(long)]
        repeat: Option<RepeatMode>,

        /// Shuffle the queue
        #[arg(long)]
        shuffle: bool,
    },

    /// Play files in order through the default output device
    #[cfg(feature = "device")]
    Play {
        /// Audio files, in queue order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Equalizer preset (overrides the configured one)
        #[arg(long)]
        preset: Option<EqPreset>,

        /// Repeat mode: off, all or one
        #[arg(long)]
        repeat: Option<RepeatMode>,

        /// Shuffle the queue
        #[arg(long)]
        shuffle: bool,
    },

    /// List equalizer presets
    Presets,

    /// Print the equalizer magnitude response at the band centres
    Response {
        #[arg(long, default_value = "flat")]
        preset: EqPreset,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emepetre=info,emepetre_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            files,
            output,
            preset,
            seconds,
            repeat,
            shuffle,
        } => {
            let mut config = CliConfig::load(cli.config.as_deref())?;
            if let Some(repeat) = repeat {
                config.player.repeat = repeat;
            }
            if shuffle {
                config.player.shuffle = true;
            }
            let sample_rate = config.output.sample_rate;

            tracing::info!(tracks = files.len(), output = %output.display(), "rendering");
            let summary = render::render(
                &config,
                RenderJob {
                    files,
                    output: output.clone(),
                    preset,
                    max_seconds: seconds,
                },
            )
            .await?;

            println!(
                "Wrote {:.2}s ({} tracks) to {}; peak limiter reduction {:.1} dB",
                summary.seconds(sample_rate),
                summary.tracks_played,
                output.display(),
                summary.peak_reduction_db
            );
        }
        #[cfg(feature = "device")]
        Command::Play {
            files,
            preset,
            repeat,
            shuffle,
        } => {
            let mut config = CliConfig::load(cli.config.as_deref())?;
            if let Some(repeat) = repeat {
                config.player.repeat = repeat;
            }
            if shuffle {
                config.player.shuffle = true;
            }

            tracing::info!(tracks = files.len(), "playing");
            play::play(&config, files, preset).await?;
        }
        Command::Presets => {
            for preset in EqPreset::ALL {
                let gains = preset
                    .gains()
                    .iter()
                    .map(|g| format!("{g:+.0}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{:<12} {:<12} preamp {:+.0} dB  [{}]",
                    preset.id(),
                    preset.name(),
                    preset.preamp_db(),
                    gains
                );
            }
        }
        Command::Response { preset } => {
            let sample_rate = CliConfig::load(cli.config.as_deref())?.output.sample_rate;
            let mut equalizer = Equalizer::new(sample_rate);
            equalizer.apply_preset(preset);
            let response = equalizer.frequency_response(&EQ_FREQUENCIES);
            for (freq, magnitude) in EQ_FREQUENCIES.iter().zip(&response.magnitudes) {
                println!("{:>6} Hz  {:+6.2} dB", freq, 20.0 * magnitude.log10());
            }
        }
    }

    Ok(())
}
