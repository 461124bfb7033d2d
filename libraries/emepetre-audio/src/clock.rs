//! Audio clocks
//!
//! Playback position is clock arithmetic (`now - start`), so the clock is
//! injected: `SystemClock` for real playback, `ManualClock` for tests and
//! offline rendering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock: Send + Sync {
    /// Seconds since the clock was created
    fn now(&self) -> f64;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and hand
/// another to the backend.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `seconds` (negative values are ignored)
    pub fn advance(&self, seconds: f64) {
        if seconds <= 0.0 || !seconds.is_finite() {
            return;
        }
        let next = self.now() + seconds;
        self.set(next);
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
