//! Phase countdown.
//!
//! Pure deadline arithmetic: every method takes `now` from the caller,
//! so tests can jump past a deadline without sleeping and the result
//! never depends on how often the timer is checked.

use std::time::{Duration, Instant};

/// Deadline of the running phase (a clue turn or the vote).
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    deadline: Option<Instant>,
    duration: Duration,
    paused: bool,
}

impl SessionTimer {
    /// A timer with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh countdown of `seconds` from `now`, replacing any
    /// previous deadline and clearing a pause.
    pub fn arm(&mut self, now: Instant, seconds: u64) {
        self.duration = Duration::from_secs(seconds);
        self.deadline = Some(now + self.duration);
        self.paused = false;
    }

    /// Stops the countdown for good (the session is over).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Returns `true` if a deadline is set and the timer is not paused.
    pub fn is_running(&self) -> bool {
        self.deadline.is_some() && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Length of the most recently armed phase.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left before the deadline. Zero if idle, paused, or expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) if !self.paused => deadline.saturating_duration_since(now),
            _ => Duration::ZERO,
        }
    }

    /// Whole seconds left, rounded up: 0.4 s left still shows as 1 so the
    /// countdown reaches 0 exactly when the deadline passes.
    pub fn remaining_seconds(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        let secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 { secs + 1 } else { secs }
    }

    /// Returns `true` once `now` has reached a running deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.paused => now >= deadline,
            _ => false,
        }
    }
}
