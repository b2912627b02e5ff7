//! One-shot settle timer

use std::time::{Duration, Instant};

/// Single-shot timer that is re-armed rather than stacked.
///
/// The timer does not sleep by itself: the event loop waits for
/// [`SettleTimer::deadline`] and then calls [`SettleTimer::fire`].
#[derive(Debug, Clone)]
pub struct SettleTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SettleTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Arm the timer, replacing any pending deadline
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed; true at most once per arm.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
