//! Clock abstraction for testable time handling.

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDateTime, TimeDelta};
use routines_domain::time::Timestamp;

/// A clock that provides the current time.
pub trait Clock: Send + Sync {
    /// Current instant, in UTC.
    fn now(&self) -> Timestamp;

    /// Current wall-clock time in the desktop's timezone.
    fn local_now(&self) -> NaiveDateTime;
}

/// Real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        routines_domain::time::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time.
///
/// Its local time is the UTC time with the offset dropped.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<Timestamp>>,
}

impl FakeClock {
    #[must_use]
    pub fn new(at: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(at)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, at: Timestamp) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = at;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(routines_domain::time::now())
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}
