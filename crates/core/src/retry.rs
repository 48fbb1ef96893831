//! Bounded retry schedule for listener-issued advance requests.

use std::time::Duration;

/// Delays before each advance attempt: immediately, then +2 s, then +5 s.
pub const ADVANCE_RETRY_DELAYS: [Duration; 3] = [
    Duration::ZERO,
    Duration::from_secs(2),
    Duration::from_secs(5),
];

/// A fixed, finite list of delays. Attempt `n` waits `delays[n]` first.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    delays: &'static [Duration],
}

impl RetryPolicy {
    pub const fn new(delays: &'static [Duration]) -> Self {
        Self { delays }
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    /// Delay before attempt `attempt` (zero-based), or `None` once the
    /// schedule is exhausted.
    pub fn delay_before(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&ADVANCE_RETRY_DELAYS)
    }
}
