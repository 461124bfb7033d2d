//! Emepetre Playback
//!
//! Transport and queue management on top of `emepetre-audio`.
//!
//! This crate provides:
//! - `PlaybackEngine`: load/play/pause/stop/seek over the audio graph, with
//!   clock-based position tracking, deferred starts behind a context resume
//!   and a typed event bus (`loaded`, `time-updated`, `ended`, `error`,
//!   `state-changed`)
//! - `PlayerController`: queue with shuffle and repeat, history, resume
//!   persistence and media-session integration
//! - `PlayerService`: a tokio command loop that owns the controller
//!
//! # Architecture
//!
//! Everything runs on one logical thread of control. The engine never
//! schedules work by itself; its owner calls `tick()` once per frame. Time
//! comes from the audio context's clock, so tests advance a `ManualClock`
//! instead of sleeping.
//!
//! # Example: Playing a queue
//!
//! ```rust,no_run
//! use emepetre_audio::{HeadlessBackendFactory, SystemClock};
//! use emepetre_core::{MemoryStore, Track, TrackId};
//! use emepetre_playback::{PlayerConfig, PlayerController};
//! use std::sync::Arc;
//!
//! # async fn example() -> emepetre_playback::Result<()> {
//! let factory = HeadlessBackendFactory::new(44100, Arc::new(SystemClock::new()));
//! let store = Arc::new(MemoryStore::new());
//! let mut player =
//!     PlayerController::new(Arc::new(factory), store, PlayerConfig::default())?;
//!
//! let album = vec![
//!     Track::new(TrackId::new("1"), "Opening", 181.0),
//!     Track::new(TrackId::new("2"), "Closing", 240.0),
//! ];
//! player.load_and_play(album[0].clone(), Some(album)).await?;
//! player.cycle_repeat();
//!
//! loop {
//!     player.tick().await;
//!     for event in player.drain_events() {
//!         println!("{event:?}");
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod controller;
pub mod engine;
mod error;
pub mod events;
mod history;
pub mod media;
mod queue;
mod schedule;
mod service;
mod shuffle;
pub mod types;

pub use controller::{PlayerController, PlayerEvent};
pub use engine::{PlaybackEngine, TransportState, END_TOLERANCE_SECS};
pub use error::{PlaybackError, Result};
pub use events::{EngineEvent, EventBus, EventKind, Subscription};
pub use history::History;
pub use media::{MediaAction, MediaHandler, MediaMetadata, MediaSession};
pub use queue::Queue;
pub use schedule::FrameTicker;
pub use service::{PlayerCommand, PlayerHandle, PlayerService};
pub use shuffle::Shuffler;
pub use types::{PlayerConfig, RepeatMode};
