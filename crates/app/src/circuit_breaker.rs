//! Runaway-evaluation guard.

use chrono::TimeDelta;
use routines_domain::time::Timestamp;

/// Decision for one evaluation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// The limit was just exceeded. Reported once per window.
    Tripped,
    Suppressed,
}

/// Counts evaluations in a rolling window and refuses those above `limit`.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    limit: u32,
    window: TimeDelta,
    window_start: Option<Timestamp>,
    count: u32,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(limit: u32, window: TimeDelta) -> Self {
        Self {
            limit,
            window,
            window_start: None,
            count: 0,
        }
    }

    /// Register one evaluation at `now`.
    pub fn check(&mut self, now: Timestamp) -> Verdict {
        match self.window_start {
            Some(start) if now - start <= self.window => {}
            _ => {
                self.window_start = Some(now);
                self.count = 0;
            }
        }
        self.count = self.count.saturating_add(1);
        if self.count <= self.limit {
            Verdict::Allowed
        } else if self.count == self.limit + 1 {
            Verdict::Tripped
        } else {
            Verdict::Suppressed
        }
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(100, TimeDelta::seconds(60))
    }
}
