//! In-process engine event bus backed by a tokio broadcast channel.

use std::future::Future;

use routines_domain::error::RoutinesError;
use routines_domain::event::Event;
use tokio::sync::broadcast;

use crate::ports::EventPublisher;

/// Fan-out of engine [`Event`]s to every live receiver.
///
/// Publishing never fails: with no receiver the event is dropped, and a
/// receiver that falls more than `capacity` events behind observes a lag.
#[derive(Debug, Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), RoutinesError>> + Send {
        if self.sender.send(event).is_err() {
            tracing::trace!("engine event dropped, no receiver");
        }
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use routines_domain::event::EventType;
    use routines_domain::id::RoutineId;

    use super::*;

    #[tokio::test]
    async fn should_deliver_event_to_every_subscriber() {
        let bus = InProcessEventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        let routine_id = RoutineId::new();
        let event = Event::new(
            EventType::RoutineActivated,
            Some(routine_id.clone()),
            serde_json::json!({"name": "Focus"}),
        );
        bus.publish(event.clone()).await.unwrap();

        assert_eq!(first.recv().await.unwrap(), event);
        let received = second.recv().await.unwrap();
        assert_eq!(received.routine_id, Some(routine_id));
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(8);
        let event = Event::new(EventType::RoutinesOverloaded, None, serde_json::json!({}));
        assert!(bus.publish(event).await.is_ok());
    }

    #[tokio::test]
    async fn should_not_replay_events_published_before_subscription() {
        let bus = InProcessEventBus::new(8);
        bus.publish(Event::new(EventType::RoutineAdded, None, serde_json::json!({})))
            .await
            .unwrap();

        let mut rx = bus.subscribe();
        let later = Event::new(EventType::RoutineRemoved, None, serde_json::json!({}));
        bus.publish(later.clone()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, later.id);
    }
}
