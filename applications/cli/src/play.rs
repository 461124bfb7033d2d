/// Live playback through the default output device
use crate::config::CliConfig;
use crate::media::LogMediaSession;
use crate::render::{build_catalog, log_events};
use anyhow::{bail, Context, Result};
use emepetre_audio::{CpalBackendFactory, EqPreset};
use emepetre_core::MemoryStore;
use emepetre_playback::PlayerController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Play `files` in queue order until the queue ends or Ctrl-C
pub async fn play(config: &CliConfig, files: Vec<PathBuf>, preset: Option<EqPreset>) -> Result<()> {
    if files.is_empty() {
        bail!("nothing to play");
    }

    let store = Arc::new(MemoryStore::new());
    let catalog = build_catalog(&files, &store).await?;

    let factory = CpalBackendFactory::new(config.output.latency());
    let mut player = PlayerController::new(Arc::new(factory), store, config.player.clone())?
        .with_media_session(Box::new(LogMediaSession::default()));
    if let Some(preset) = preset {
        player.engine_mut().apply_preset(preset);
    }

    player
        .load_and_play(catalog[0].clone(), Some(catalog.clone()))
        .await
        .with_context(|| format!("failed to start {}", files[0].display()))?;

    let mut frames = tokio::time::interval(config.player.frame_interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                player.tick().await;
                log_events(player.drain_events());

                let engine = player.engine_mut();
                if !engine.is_playing() && !engine.is_start_pending() {
                    tracing::info!("queue finished");
                    break;
                }
            }
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupted");
                break;
            }
        }
    }

    player.destroy();
    Ok(())
}
