//! Play queue
//!
//! Two orderings of the same tracks:
//! - `original`: as supplied by the caller
//! - `active`: the order actually played; equals `original` unless shuffle
//!   is on, in which case it is a permutation with the current track first
//!
//! `current` is `None` or a valid index into `active`.

use crate::shuffle::Shuffler;
use emepetre_core::{Track, TrackId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    original: Vec<Track>,
    active: Vec<Track>,
    current: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both orderings with `tracks`
    ///
    /// With a shuffler the active order is shuffled with `selected` pinned
    /// and the index is 0. Without one the index is `selected`'s position,
    /// or 0 when it is not in `tracks`.
    pub fn replace(
        &mut self,
        tracks: Vec<Track>,
        selected: Option<&TrackId>,
        shuffler: Option<&mut Shuffler>,
    ) {
        self.active = match shuffler {
            Some(shuffler) => shuffler.shuffled(&tracks, selected),
            None => tracks.clone(),
        };
        self.original = tracks;

        if self.active.is_empty() {
            self.current = None;
            return;
        }
        let found = selected.and_then(|id| self.position_of(id));
        if found.is_none() {
            if let Some(id) = selected {
                tracing::warn!(track_id = %id, "selected track not in supplied queue, starting at 0");
            }
        }
        self.current = Some(found.unwrap_or(0));
    }

    /// Shuffle the original order into the active one, pinning `current`
    pub fn shuffle_on(&mut self, shuffler: &mut Shuffler, current: Option<&TrackId>) {
        self.active = shuffler.shuffled(&self.original, current);
        self.current = self.reindex(current);
    }

    /// Restore the original order and find `current` in it
    pub fn shuffle_off(&mut self, current: Option<&TrackId>) {
        self.active = self.original.clone();
        self.current = self.reindex(current);
    }

    fn reindex(&self, current: Option<&TrackId>) -> Option<usize> {
        if self.active.is_empty() {
            return None;
        }
        Some(current.and_then(|id| self.position_of(id)).unwrap_or(0))
    }

    /// Append to the active order only
    pub fn push(&mut self, track: Track) {
        self.active.push(track);
    }

    /// Remove the track at `index`; returns it if the index was valid
    ///
    /// The current index moves down when the removal was before it and is
    /// clamped to the new length.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.active.len() {
            tracing::warn!(index, len = self.active.len(), "remove index out of range");
            return None;
        }

        let removed = self.active.remove(index);
        self.current = match self.current {
            _ if self.active.is_empty() => None,
            Some(cur) => {
                let shifted = if index < cur { cur - 1 } else { cur };
                Some(shifted.min(self.active.len() - 1))
            }
            None => None,
        };
        Some(removed)
    }

    /// Move the track at `from` so it ends up at `to`
    ///
    /// The current index follows the track it pointed at.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.active.len();
        if from >= len || to >= len {
            tracing::warn!(from, to, len, "queue move out of range");
            return false;
        }

        let track = self.active.remove(from);
        self.active.insert(to, track);

        self.current = self.current.map(|cur| {
            if cur == from {
                to
            } else if from < cur && to >= cur {
                cur - 1
            } else if from > cur && to <= cur {
                cur + 1
            } else {
                cur
            }
        });
        true
    }

    /// Point at `index`; out-of-range values are rejected
    pub fn set_current(&mut self, index: Option<usize>) -> bool {
        match index {
            Some(i) if i >= self.active.len() => {
                tracing::warn!(index = i, len = self.active.len(), "queue index out of range");
                false
            }
            _ => {
                self.current = index;
                true
            }
        }
    }

    pub fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.active.iter().position(|t| &t.id == id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.active.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.active.get(index)
    }

    /// Tracks in play order
    pub fn tracks(&self) -> &[Track] {
        &self.active
    }

    pub fn original(&self) -> &[Track] {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
