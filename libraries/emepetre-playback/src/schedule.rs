//! Repeating frame task for position reporting
//!
//! The engine owns the ticker. `start` arms it and `cancel` disarms it; a
//! disarmed ticker never fires, so leaving the playing state cannot leak
//! scheduled work.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FrameTicker {
    interval: f64,
    armed: bool,
    next_due: f64,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.as_secs_f64(),
            armed: false,
            next_due: 0.0,
        }
    }

    /// Arm the ticker at clock time `now`; the first frame is due one
    /// interval later
    pub fn start(&mut self, now: f64) {
        self.armed = true;
        self.next_due = now + self.interval;
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    /// True when a frame is due at `now`; reschedules the next one
    ///
    /// Missed frames collapse into one.
    pub fn poll(&mut self, now: f64) -> bool {
        if !self.armed || now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let mut ticker = FrameTicker::new(Duration::from_millis(100));
        ticker.start(0.0);

        assert!(!ticker.poll(0.05));
        assert!(ticker.poll(0.1));
        assert!(!ticker.poll(0.15));
        assert!(ticker.poll(0.2));
    }

    #[test]
    fn missed_frames_collapse() {
        let mut ticker = FrameTicker::new(Duration::from_millis(16));
        ticker.start(0.0);

        assert!(ticker.poll(30.0));
        assert!(!ticker.poll(30.001));
    }

    #[test]
    fn cancelled_ticker_never_fires() {
        let mut ticker = FrameTicker::new(Duration::from_millis(16));
        ticker.start(0.0);
        ticker.cancel();

        assert!(!ticker.poll(10.0));

        ticker.start(10.0);
        assert!(!ticker.poll(10.01));
        assert!(ticker.poll(10.02));
    }
}
