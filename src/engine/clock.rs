use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The audio clock: frames rendered so far, shared between the audio thread
/// (which advances it after each block) and the control side (which reads it
/// to decide what to schedule).
///
/// Time only moves when audio is rendered, so in offline mode the clock is
/// exactly as far along as the caller has pulled.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f32,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Current clock time in seconds.
    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }
}
