//! Command loop around a [`PlayerController`]
//!
//! One task owns the controller. Commands arrive over an mpsc channel and
//! are applied in order; an interval drives the per-frame tick between them.
//! Player events are forwarded to an optional subscriber channel.

use crate::controller::{PlayerController, PlayerEvent};
use crate::error::Result;
use emepetre_audio::EqPreset;
use emepetre_core::Track;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

/// Commands accepted by the service
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    LoadAndPlay {
        track: Track,
        queue: Option<Vec<Track>>,
    },
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek(f64),
    SetVolume(f32),
    ToggleMute,
    ToggleShuffle,
    CycleRepeat,
    SetQueue {
        tracks: Vec<Track>,
        index: usize,
    },
    AddToQueue(Track),
    RemoveFromQueue(usize),
    MoveInQueue {
        from: usize,
        to: usize,
    },
    SetBandGain {
        index: usize,
        gain_db: f32,
    },
    ApplyPreset(EqPreset),
    ResetEqualizer,
    SaveState,
    Shutdown,
}

/// Sending side of a running service
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    /// Queue a command; false once the service has stopped
    pub async fn send(&self, command: PlayerCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    /// Ask the service to stop; false if it already has
    pub async fn shutdown(&self) -> bool {
        self.send(PlayerCommand::Shutdown).await
    }
}

pub struct PlayerService {
    controller: PlayerController,
    commands: mpsc::Receiver<PlayerCommand>,
    events: Option<mpsc::UnboundedSender<PlayerEvent>>,
}

impl PlayerService {
    /// Wrap `controller`; commands beyond `capacity` wait for room
    pub fn new(controller: PlayerController, capacity: usize) -> (Self, PlayerHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let service = Self {
            controller,
            commands: rx,
            events: None,
        };
        (service, PlayerHandle { tx })
    }

    /// Receive every player event from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Run until `Shutdown` or every handle is dropped
    ///
    /// The controller is destroyed on exit and handed back.
    pub async fn run(mut self) -> PlayerController {
        let mut ticker = time::interval(self.controller.config().frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_ms = self.controller.config().frame_interval_ms,
            "player service started"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        None | Some(PlayerCommand::Shutdown) => break,
                        Some(command) => {
                            if let Err(e) = self.apply(command).await {
                                tracing::warn!(error = %e, "player command failed");
                            }
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.controller.tick().await;
                }
            }
            self.forward_events();
        }

        self.controller.destroy();
        self.forward_events();
        tracing::info!("player service stopped");
        self.controller
    }

    async fn apply(&mut self, command: PlayerCommand) -> Result<()> {
        tracing::debug!(?command, "player command");
        let controller = &mut self.controller;
        match command {
            PlayerCommand::LoadAndPlay { track, queue } => {
                return controller.load_and_play(track, queue).await
            }
            PlayerCommand::Play => return controller.play().await,
            PlayerCommand::Pause => controller.pause().await,
            PlayerCommand::Stop => controller.stop(),
            PlayerCommand::Next => return controller.next().await,
            PlayerCommand::Previous => return controller.previous().await,
            PlayerCommand::Seek(position) => return controller.seek(position),
            PlayerCommand::SetVolume(volume) => controller.set_volume(volume),
            PlayerCommand::ToggleMute => controller.toggle_mute(),
            PlayerCommand::ToggleShuffle => controller.toggle_shuffle(),
            PlayerCommand::CycleRepeat => {
                controller.cycle_repeat();
            }
            PlayerCommand::SetQueue { tracks, index } => controller.set_queue(tracks, index),
            PlayerCommand::AddToQueue(track) => controller.add_to_queue(track),
            PlayerCommand::RemoveFromQueue(index) => {
                controller.remove_from_queue(index);
            }
            PlayerCommand::MoveInQueue { from, to } => {
                controller.move_in_queue(from, to);
            }
            PlayerCommand::SetBandGain { index, gain_db } => {
                controller.engine_mut().set_band_gain(index, gain_db);
            }
            PlayerCommand::ApplyPreset(preset) => controller.engine_mut().apply_preset(preset),
            PlayerCommand::ResetEqualizer => controller.engine_mut().reset_equalizer(),
            PlayerCommand::SaveState => controller.save_state().await,
            PlayerCommand::Shutdown => {}
        }
        Ok(())
    }

    fn forward_events(&mut self) {
        let events = self.controller.drain_events();
        let Some(tx) = &self.events else {
            return;
        };
        for event in events {
            if tx.send(event).is_err() {
                tracing::debug!("event subscriber gone");
                self.events = None;
                return;
            }
        }
    }
}
