//! Queue shuffling
//!
//! Fisher-Yates over the original order, then the current track (if any) is
//! spliced out and reinserted at the front.

use emepetre_core::{Track, TrackId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Random source for shuffles; seedable for reproducible orders
#[derive(Debug, Clone)]
pub struct Shuffler {
    rng: StdRng,
}

impl Shuffler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// A fresh permutation of `tracks`, with `pinned` moved to index 0
    ///
    /// A pinned id that is not in `tracks` is ignored.
    pub fn shuffled(&mut self, tracks: &[Track], pinned: Option<&TrackId>) -> Vec<Track> {
        let mut order = tracks.to_vec();
        order.shuffle(&mut self.rng);

        if let Some(id) = pinned {
            if let Some(pos) = order.iter().position(|t| &t.id == id) {
                let track = order.remove(pos);
                order.insert(0, track);
            }
        }
        order
    }
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::new(None)
    }
}
