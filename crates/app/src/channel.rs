//! Synchronous listener list.
//!
//! Used by triggers to notify their owner. Unlike the broadcast-based
//! [`InProcessEventBus`](crate::event_bus::InProcessEventBus), listeners run
//! inline on the emitting thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identifies a listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct EventChannel<E> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Callback<E>)>>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<E> EventChannel<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Call every listener, in subscription order.
    ///
    /// The listener list is snapshotted first: changes made by a listener
    /// apply from the next emit.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Callback<E>)>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;

    #[test]
    fn should_call_listeners_in_subscription_order() {
        let channel = EventChannel::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            channel.subscribe(move |value| log.lock().unwrap().push(format!("{name}:{value}")));
        }
        channel.emit(&7);
        assert_eq!(*log.lock().unwrap(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn should_stop_calling_unsubscribed_listener() {
        let channel = EventChannel::<()>::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let id = channel.subscribe(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        channel.emit(&());
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_apply_unsubscribe_during_emit_on_next_emit() {
        let channel = Arc::new(EventChannel::<()>::new());
        let calls = Arc::new(AtomicU64::new(0));
        let second_id = Arc::new(OnceLock::new());

        let remover = {
            let channel = Arc::clone(&channel);
            let second_id = Arc::clone(&second_id);
            move |(): &()| {
                if let Some(id) = second_id.get() {
                    channel.unsubscribe(*id);
                }
            }
        };
        channel.subscribe(remover);
        let counter = Arc::clone(&calls);
        let id = channel.subscribe(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        second_id.set(id).unwrap();

        channel.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        channel.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(channel.listener_count(), 1);
    }
}
