use std::time::{Duration, Instant};

use super::{TimerId, TimerQueue};

/// Arms a single deferred check that only survives if nothing else is played
/// within the quiet window.
#[derive(Debug)]
pub struct SilenceDetector {
    threshold: Duration,
    pending: Option<TimerId>,
}

impl SilenceDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: None,
        }
    }

    /// Takes effect on the next `arm`.
    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }

    pub fn arm<T>(&mut self, timers: &mut TimerQueue<T>, now: Instant, check: T) -> TimerId {
        self.cancel(timers);
        let id = timers.schedule(now + self.threshold, check);
        self.pending = Some(id);
        id
    }

    pub fn cancel<T>(&mut self, timers: &mut TimerQueue<T>) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
    }

    /// Acknowledges a fired timer. Returns false for a check this detector
    /// no longer owns.
    pub fn fired(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}
