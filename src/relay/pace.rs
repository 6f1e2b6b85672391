use std::time::{Duration, Instant};

/// Best-effort output rate limiter. Sleeps whatever remains of the
/// current frame's slot; a loop that has fallen behind schedule gets no
/// sleep and no catch-up burst.
pub struct Pacer {
    frame_rate: u32,
    start: Instant,
}

impl Pacer {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate,
            start: Instant::now(),
        }
    }

    pub fn wait_for_next_slot(&self, frame_index: u64) {
        let wait = Self::sleep_needed(frame_index, self.frame_rate, self.start.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    /// Remaining time until `frame_index` frames are due. Never negative.
    fn sleep_needed(frame_index: u64, frame_rate: u32, elapsed: Duration) -> Duration {
        let expected_ms = frame_index.saturating_mul(1000) / frame_rate.max(1) as u64;
        Duration::from_millis(expected_ms).saturating_sub(elapsed)
    }
}

#[cfg(test)]
#[path = "pace_test.rs"]
mod pace_test;
