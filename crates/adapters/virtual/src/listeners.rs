//! Listener registry backing [`Capabilities::subscribe`](routines_app::ports::Capabilities::subscribe).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use routines_app::ports::{Listener, Subscription};
use routines_domain::desktop::{Change, Signal};

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Mutex<Vec<(u64, Signal, Listener)>>,
    next_id: AtomicU64,
}

impl Listeners {
    /// Attach `listener`. The returned subscription detaches it.
    pub(crate) fn register(self: &Arc<Self>, signal: Signal, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, signal, listener));
        let registry = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().retain(|(entry, _, _)| *entry != id);
            }
        })
    }

    /// Call every listener watching the signal of `change`.
    ///
    /// Listeners are collected first and called without holding the lock,
    /// so a listener may subscribe or cancel from inside its callback.
    pub(crate) fn emit(&self, change: &Change) {
        let signal = change.signal();
        let targets: Vec<Listener> = self
            .lock()
            .iter()
            .filter(|(_, watched, _)| *watched == signal)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        tracing::trace!(?signal, listeners = targets.len(), "emitting change");
        for listener in targets {
            listener(change);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Signal, Listener)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
