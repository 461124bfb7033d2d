/// Offline rendering: plays a queue through the full core into a WAV file
use crate::config::CliConfig;
use crate::media::LogMediaSession;
use anyhow::{bail, Context, Result};
use emepetre_audio::{EqPreset, HeadlessBackendFactory, ManualClock};
use emepetre_core::{MemoryStore, Track, TrackId};
use emepetre_playback::{PlayerController, PlayerEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct RenderJob {
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
    pub preset: Option<EqPreset>,
    /// Stop after this much output even if the queue keeps going
    pub max_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub tracks_played: usize,
    /// Deepest limiter gain reduction seen, in dB
    pub peak_reduction_db: f32,
}

impl RenderSummary {
    pub fn seconds(&self, sample_rate: u32) -> f64 {
        self.frames as f64 / f64::from(sample_rate)
    }
}

/// Read `files` into an in-memory catalog
pub async fn build_catalog(files: &[PathBuf], store: &MemoryStore) -> Result<Vec<Track>> {
    let mut catalog = Vec::with_capacity(files.len());
    for (index, path) in files.iter().enumerate() {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let track = track_for(index, path, bytes.len() as u64);
        store.insert_audio(track.id.clone(), bytes).await;
        catalog.push(track);
    }
    Ok(catalog)
}

fn track_for(index: usize, path: &Path, size: u64) -> Track {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("track-{index}"));
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| stem.clone());
    Track::new(TrackId::new(format!("{index}-{stem}")), stem, 0.0).with_file(file_name, size)
}

pub async fn render(config: &CliConfig, job: RenderJob) -> Result<RenderSummary> {
    if job.files.is_empty() {
        bail!("nothing to play");
    }

    let store = Arc::new(MemoryStore::new());
    let catalog = build_catalog(&job.files, &store).await?;

    let sample_rate = config.output.sample_rate;
    let block_frames = config.output.block_frames;
    let clock = ManualClock::new();
    let factory = HeadlessBackendFactory::new(sample_rate, Arc::new(clock.clone()));

    let mut player = PlayerController::new(Arc::new(factory), store, config.player.clone())?
        .with_media_session(Box::new(LogMediaSession::default()));
    if let Some(preset) = job.preset {
        player.engine_mut().apply_preset(preset);
    }

    player
        .load_and_play(catalog[0].clone(), Some(catalog.clone()))
        .await
        .with_context(|| format!("failed to start {}", job.files[0].display()))?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&job.output, spec)
        .with_context(|| format!("failed to create {}", job.output.display()))?;

    let max_frames = job
        .max_seconds
        .map(|s| (s.max(0.0) * f64::from(sample_rate)) as u64);
    let block_secs = block_frames as f64 / f64::from(sample_rate);
    let mut block = vec![0.0f32; 2 * block_frames];
    let mut frames = 0u64;
    let mut peak_reduction_db = 0.0f32;

    loop {
        let engine = player.engine_mut();
        if !engine.is_playing() && !engine.is_start_pending() {
            break;
        }
        if max_frames.is_some_and(|max| frames >= max) {
            tracing::info!(seconds = frames as f64 / f64::from(sample_rate), "render limit reached");
            break;
        }

        let written = engine.render(&mut block);
        for sample in &block[..written * 2] {
            writer.write_sample(*sample)?;
        }
        frames += written as u64;
        peak_reduction_db = peak_reduction_db.min(engine.limiter_reduction());

        clock.advance(block_secs);
        player.tick().await;
        log_events(player.drain_events());
    }

    writer.finalize().context("failed to finish WAV file")?;
    let tracks_played = player.history().len();
    player.destroy();

    Ok(RenderSummary {
        frames,
        tracks_played,
        peak_reduction_db,
    })
}

pub fn log_events(events: Vec<PlayerEvent>) {
    for event in events {
        match event {
            PlayerEvent::PositionChanged { .. } => {}
            PlayerEvent::Error { message } => tracing::error!(%message, "playback error"),
            PlayerEvent::TrackChanged { track_id, index } => {
                tracing::info!(%track_id, ?index, "track changed");
            }
            other => tracing::debug!(event = ?other, "player event"),
        }
    }
}
