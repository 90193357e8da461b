//! Quiet-period coalescing.
//!
//! A burst of rapid triggers (streamed tokens, file system events) collapses
//! into a single firing once the configured quiet period elapses after the
//! last trigger. The caller supplies the clock, so behavior is deterministic
//! and tests never sleep.

use std::time::{Duration, Instant};

/// Debounced task scheduler: trigger any number of times, fire once per
/// quiet window. A newer trigger supersedes an older pending one — last
/// scheduled wins.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl Debouncer {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
        }
    }

    /// Record a trigger at `now`, restarting the quiet period.
    pub fn trigger_at(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// True while a firing is pending.
    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Returns true exactly once after the quiet period elapses.
    pub fn fire_ready(&mut self, now: Instant) -> bool {
        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if now.saturating_duration_since(pending_since) >= self.delay {
            self.pending_since = None;
            return true;
        }
        false
    }

    /// Discard any pending firing.
    pub fn cancel(&mut self) {
        self.pending_since = None;
    }
}
