//! Session play history
//!
//! One entry per successful load, oldest first. Never deduplicated or pruned.

use emepetre_core::TrackId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<TrackId>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: TrackId) {
        self.entries.push(id);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[TrackId] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TrackId> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
