//! Evaluation driver.
//!
//! Triggers never evaluate routines themselves: they push a unit signal
//! into an unbounded queue. The driver task waits for a signal, drains
//! whatever else is queued, and runs a single pass. Signals that arrive
//! while a pass is running cause exactly one follow-up pass.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use super::RoutineEngine;
use crate::ports::{Capabilities, EventPublisher, StateStore};

/// Requests an evaluation pass.
#[derive(Debug, Clone)]
pub struct SignalSender(mpsc::UnboundedSender<()>);

impl SignalSender {
    pub fn notify(&self) {
        if self.0.send(()).is_err() {
            tracing::trace!("evaluation driver is gone, signal dropped");
        }
    }
}

#[derive(Debug)]
pub struct SignalReceiver(mpsc::UnboundedReceiver<()>);

impl SignalReceiver {
    /// Wait for at least one signal and swallow any others already queued.
    ///
    /// Returns the number of signals coalesced, or `None` once every sender
    /// is gone.
    pub async fn next(&mut self) -> Option<usize> {
        self.0.recv().await?;
        let mut coalesced = 1;
        while self.0.try_recv().is_ok() {
            coalesced += 1;
        }
        Some(coalesced)
    }
}

#[must_use]
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (SignalSender(sender), SignalReceiver(receiver))
}

/// Run one evaluation per batch of signals until the queue closes.
pub async fn drive<S, C, P>(engine: Arc<Mutex<RoutineEngine<S, C, P>>>, mut signals: SignalReceiver)
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    while let Some(coalesced) = signals.next().await {
        tracing::trace!(coalesced, "evaluation requested");
        let mut engine = engine.lock().await;
        if let Err(err) = engine.evaluate().await {
            tracing::error!(error = %err, "evaluation pass failed");
        }
    }
    tracing::debug!("evaluation driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_coalesce_queued_signals_into_one_batch() {
        let (sender, mut receiver) = signal_channel();
        sender.notify();
        sender.notify();
        sender.notify();

        assert_eq!(receiver.next().await, Some(3));

        sender.notify();
        assert_eq!(receiver.next().await, Some(1));
    }

    #[tokio::test]
    async fn should_end_when_every_sender_is_dropped() {
        let (sender, mut receiver) = signal_channel();
        sender.notify();
        drop(sender);

        assert_eq!(receiver.next().await, Some(1));
        assert_eq!(receiver.next().await, None);
    }
}
