//! Typed identifier newtypes.
//!
//! Identifiers are opaque strings: generated ones are UUID v4, but
//! configurations authored elsewhere may carry any non-empty string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty (only possible through deserialization).
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                Ok(Self(s.to_string()))
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`RoutineConfig`](crate::routine::RoutineConfig).
    RoutineId
);

define_id!(
    /// Identifier of a trigger, unique within its routine.
    TriggerId
);

define_id!(
    /// Identifier of an action, unique within its routine.
    ActionId
);

define_id!(
    /// Unique identifier for an [`Event`](crate::event::Event).
    EventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = RoutineId::new();
        let b = RoutineId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = TriggerId::new();
        let parsed: TriggerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_accept_non_uuid_identifiers() {
        let id = ActionId::from_str("a1").unwrap();
        assert_eq!(id.as_str(), "a1");
    }

    #[test]
    fn should_serialize_as_plain_string() {
        let id = RoutineId::from_str("morning").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"morning\"");
    }

    #[test]
    fn should_return_error_when_parsing_blank_id() {
        let result = RoutineId::from_str("  ");
        assert!(matches!(result, Err(ValidationError::EmptyId)));
    }
}
