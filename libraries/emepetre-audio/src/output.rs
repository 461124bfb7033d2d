//! Hand-off between the render loop and a device callback
//!
//! The render side pushes interleaved stereo frames up to a fixed capacity.
//! The device callback drains them and counts every frame it outputs,
//! underruns included; that count is the context clock of a device backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct OutputRing {
    sample_rate: u32,
    capacity_frames: usize,
    queue: Mutex<VecDeque<f32>>,
    frames_played: AtomicU64,
    underruns: AtomicU64,
}

impl OutputRing {
    pub fn new(sample_rate: u32, capacity_frames: usize) -> Self {
        let capacity_frames = capacity_frames.max(1);
        Self {
            sample_rate,
            capacity_frames,
            queue: Mutex::new(VecDeque::with_capacity(capacity_frames * 2)),
            frames_played: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn queued_frames(&self) -> usize {
        self.queue.lock().map(|q| q.len() / 2).unwrap_or(0)
    }

    /// Frames that can be pushed without exceeding the capacity
    pub fn demand(&self) -> usize {
        self.capacity_frames.saturating_sub(self.queued_frames())
    }

    /// Queue interleaved stereo frames; returns frames accepted
    pub fn push(&self, samples: &[f32]) -> usize {
        let Ok(mut queue) = self.queue.lock() else {
            return 0;
        };
        let room = self.capacity_frames.saturating_sub(queue.len() / 2);
        let frames = (samples.len() / 2).min(room);
        queue.extend(&samples[..frames * 2]);
        frames
    }

    /// Device callback: fill `out`, interleaved `channels` wide
    ///
    /// Missing frames are written as silence. Mono devices get the average
    /// of both channels; channels past the second stay silent.
    pub fn fill(&self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len().div_ceil(channels);

        match self.queue.lock() {
            Ok(mut queue) => {
                let mut short = false;
                for frame in out.chunks_mut(channels) {
                    let (l, r) = match (queue.pop_front(), queue.pop_front()) {
                        (Some(l), Some(r)) => (l, r),
                        _ => {
                            short = true;
                            (0.0, 0.0)
                        }
                    };
                    write_frame(frame, l, r);
                }
                if short {
                    self.underruns.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(_) => out.fill(0.0),
        }

        self.frames_played.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn frames_played(&self) -> u64 {
        self.frames_played.load(Ordering::Relaxed)
    }

    /// Callbacks that ran out of queued frames
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Device time in seconds
    pub fn seconds_played(&self) -> f64 {
        self.frames_played() as f64 / f64::from(self.sample_rate.max(1))
    }
}

#[inline]
fn write_frame(frame: &mut [f32], l: f32, r: f32) {
    match frame {
        [mono] => *mono = (l + r) * 0.5,
        [left, right, rest @ ..] => {
            *left = l;
            *right = r;
            rest.fill(0.0);
        }
        [] => {}
    }
}
