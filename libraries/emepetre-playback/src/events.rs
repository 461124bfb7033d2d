//! Engine events
//!
//! The engine publishes on one channel per event kind. Listeners subscribe
//! to a kind and get a [`Subscription`] handle back for unsubscribing. A
//! listener that panics is logged and skipped; the remaining listeners of
//! the same event still run.

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// A buffer was decoded and is ready to play
    Loaded {
        duration: f64,
        channels: u16,
        sample_rate: u32,
    },

    /// Position report; every tick while playing, once on seek and stop
    TimeUpdated { current: f64, duration: f64 },

    /// The track played to its natural end
    Ended,

    /// Initialization or decode failure
    Error { message: String, cause: String },

    /// Transport moved in or out of playing
    StateChanged { playing: bool },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Loaded { .. } => EventKind::Loaded,
            Self::TimeUpdated { .. } => EventKind::TimeUpdated,
            Self::Ended => EventKind::Ended,
            Self::Error { .. } => EventKind::Error,
            Self::StateChanged { .. } => EventKind::StateChanged,
        }
    }
}

/// Event channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Loaded,
    TimeUpdated,
    Ended,
    Error,
    StateChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Loaded,
        EventKind::TimeUpdated,
        EventKind::Ended,
        EventKind::Error,
        EventKind::StateChanged,
    ];

    fn slot(self) -> usize {
        match self {
            Self::Loaded => 0,
            Self::TimeUpdated => 1,
            Self::Ended => 2,
            Self::Error => 3,
            Self::StateChanged => 4,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

type Listener = Box<dyn FnMut(&EngineEvent) + Send>;

/// Per-kind listener registry
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    channels: [Vec<(u64, Listener)>; 5],
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> Subscription
    where
        F: FnMut(&EngineEvent) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.channels[kind.slot()].push((id, Box::new(listener)));
        Subscription { kind, id }
    }

    /// Remove one listener; returns false if it was already gone
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let channel = &mut self.channels[subscription.kind.slot()];
        let before = channel.len();
        channel.retain(|(id, _)| *id != subscription.id);
        channel.len() != before
    }

    pub fn clear_kind(&mut self, kind: EventKind) {
        self.channels[kind.slot()].clear();
    }

    pub fn clear_all(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.channels[kind.slot()].len()
    }

    /// Deliver `event` to every listener of its kind, in subscription order
    pub fn emit(&mut self, event: &EngineEvent) {
        let kind = event.kind();
        for (id, listener) in &mut self.channels[kind.slot()] {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(?kind, listener = *id, "event listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind, &self.listener_count(kind));
        }
        map.finish()
    }
}
