//! Timer port: one-shot delayed callbacks.
//!
//! Triggers arm timers for polling and debouncing. Production code uses
//! [`TokioScheduler`]; tests drive a [`ManualScheduler`] by hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

/// Work to run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Handle on an armed timer.
///
/// Dropping the handle leaves the timer armed; only [`cancel`](Self::cancel)
/// disarms it.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Disarm the timer. Has no effect once it has fired.
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TimerHandle")
    }
}

/// Arms one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Run `callback` once `delay` has elapsed.
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Scheduler spawning a sleeping task on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        TimerHandle::new(move || task.abort())
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    elapsed: Duration,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// Scheduler whose time only moves when [`advance`](Self::advance) is called.
///
/// Timers due at the same instant fire in the order they were armed.
/// Callbacks may arm new timers; those fire within the same `advance`
/// call when they fall due before its end.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward, firing every timer that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().elapsed + by;
        loop {
            let next = {
                let mut state = self.lock();
                state
                    .pending
                    .retain(|pending| !pending.cancelled.load(Ordering::SeqCst));
                let index = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, pending)| pending.due <= target)
                    .min_by_key(|(_, pending)| (pending.due, pending.seq))
                    .map(|(index, _)| index);
                match index {
                    Some(index) => {
                        let pending = state.pending.swap_remove(index);
                        state.elapsed = pending.due;
                        Some(pending.callback)
                    }
                    None => {
                        state.elapsed = target;
                        None
                    }
                }
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Number of armed timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|pending| !pending.cancelled.load(Ordering::SeqCst))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            let due = state.elapsed + delay;
            state.pending.push(Pending {
                due,
                seq,
                cancelled: Arc::clone(&cancelled),
                callback,
            });
        }
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
