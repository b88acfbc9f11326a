//! Event: an immutable record of something the engine did.
//!
//! Events are produced when routines are added, removed, activated or
//! deactivated, when an action fails, and when the engine throttles itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{EventId, RoutineId};
use crate::time::{Timestamp, now};

/// Kind of engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RoutineActivated,
    RoutineDeactivated,
    RoutineAdded,
    RoutineRemoved,
    ActionFailed,
    RoutinesOverloaded,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RoutineActivated => "routine_activated",
            Self::RoutineDeactivated => "routine_deactivated",
            Self::RoutineAdded => "routine_added",
            Self::RoutineRemoved => "routine_removed",
            Self::ActionFailed => "action_failed",
            Self::RoutinesOverloaded => "routines_overloaded",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    /// The routine concerned, absent for engine-wide events.
    pub routine_id: Option<RoutineId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        routine_id: Option<RoutineId>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            routine_id,
            data,
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_distinct_ids_for_each_event() {
        let first = Event::new(EventType::RoutineAdded, None, serde_json::json!({}));
        let second = Event::new(EventType::RoutineAdded, None, serde_json::json!({}));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn should_serialize_event_type_in_snake_case() {
        let event = Event::new(
            EventType::RoutinesOverloaded,
            None,
            serde_json::json!({"limit": 100}),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "routines_overloaded");
        assert!(json["routine_id"].is_null());
        assert_eq!(EventType::ActionFailed.to_string(), "action_failed");
    }
}
