//! Reconnect delay policy.

use std::time::Duration;

/// Exponential backoff between reconnect attempts.
///
/// The delay lives on the supervisor rather than on an individual attempt:
/// it doubles (capped at the maximum) every time a reconnect is scheduled
/// and resets to the minimum once the media transport reports fully
/// connected. A session flapping between short-lived attempts therefore
/// keeps paying the grown delay until one attempt actually converges.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a policy bounded to `[min, max]`, starting at `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Move to the next delay, `min(current * 2, max)`, and return it.
    pub fn advance(&mut self) -> Duration {
        self.current = (self.current * 2).min(self.max);
        self.current
    }

    /// Reset the delay to the minimum.
    pub fn reset(&mut self) {
        self.current = self.min;
    }

    /// The delay a reconnect scheduled right now would still double from.
    pub fn current(&self) -> Duration {
        self.current
    }
}
