//! Timer-driven trigger internals: time-window polling and clipboard debounce.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use routines_domain::desktop::ClipboardContent;
use routines_domain::routine::{ClipboardContentType, ClipboardFilter, TimeWindow};

use super::Gate;
use crate::ports::{Clock, Scheduler, TimerHandle};

/// The currently armed timer of a watch.
///
/// Once stopped, any handle placed in the slot is cancelled at once so a
/// callback racing with deactivation cannot re-arm.
#[derive(Default)]
pub(super) struct TimerSlot {
    stopped: AtomicBool,
    current: Mutex<Option<TimerHandle>>,
}

impl TimerSlot {
    fn replace(&self, handle: TimerHandle) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if self.stopped.load(Ordering::SeqCst) {
            handle.cancel();
            return;
        }
        if let Some(previous) = current.replace(handle) {
            previous.cancel();
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(super) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let handle = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }
}

/// Periodic re-evaluation of a time window.
pub(super) struct TimePoll {
    pub window: TimeWindow,
    pub inside: AtomicBool,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub every: Duration,
    pub gate: Arc<Gate>,
    pub slot: Arc<TimerSlot>,
}

impl TimePoll {
    pub fn arm(self: Arc<Self>) {
        let poll = Arc::clone(&self);
        let handle = self.scheduler.after(
            self.every,
            Box::new(move || {
                if poll.slot.is_stopped() {
                    return;
                }
                let inside = poll.window.contains(poll.clock.local_now());
                if poll.inside.swap(inside, Ordering::SeqCst) != inside {
                    tracing::debug!(inside, "time window state changed");
                    poll.gate.fire();
                }
                poll.arm();
            }),
        );
        self.slot.replace(handle);
    }
}

/// Debounced clipboard watcher.
pub(super) struct ClipboardWatch {
    pub filter: ClipboardFilter,
    pub pattern: Option<Regex>,
    pub latest: Mutex<ClipboardContent>,
    pub scheduler: Arc<dyn Scheduler>,
    pub debounce: Duration,
    pub gate: Arc<Gate>,
    pub slot: Arc<TimerSlot>,
}

impl ClipboardWatch {
    /// Record a change and restart the debounce timer.
    pub fn changed(self: &Arc<Self>, content: &ClipboardContent) {
        if self.slot.is_stopped() {
            return;
        }
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = content.clone();
        let watch = Arc::clone(self);
        let handle = self
            .scheduler
            .after(self.debounce, Box::new(move || watch.settle()));
        self.slot.replace(handle);
    }

    fn settle(&self) {
        if self.slot.is_stopped() {
            return;
        }
        let content = self
            .latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if self.accepts(&content) {
            tracing::debug!("clipboard change accepted");
            self.gate.fire();
        } else {
            tracing::debug!("clipboard change ignored by filter");
        }
    }

    pub fn accepts(&self, content: &ClipboardContent) -> bool {
        accepts(&self.filter, self.pattern.as_ref(), content)
    }
}

pub(super) fn accepts(
    filter: &ClipboardFilter,
    pattern: Option<&Regex>,
    content: &ClipboardContent,
) -> bool {
    if !filter.accepts_kind(content) {
        return false;
    }
    match (filter.content_type, pattern, content.text()) {
        (ClipboardContentType::Regex, Some(pattern), Some(text)) => pattern.is_match(text),
        (ClipboardContentType::Regex, _, _) => false,
        _ => true,
    }
}
