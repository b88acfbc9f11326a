//! Captured state: values recorded before a routine changed them.
//!
//! The whole map is persisted as one JSON document of shape
//! `{ routineId: { settingKey: value } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::RoutineId;

/// Per-routine captured values, keyed by setting name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedStates(BTreeMap<RoutineId, BTreeMap<String, Value>>);

impl CapturedStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` unless a value is already captured for the key.
    ///
    /// Returns `true` when the value was stored.
    pub fn insert_if_absent(&mut self, routine_id: &RoutineId, key: &str, value: Value) -> bool {
        let entries = self.0.entry(routine_id.clone()).or_default();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), value);
        true
    }

    /// Store `value`, replacing whatever was there.
    pub fn put(&mut self, routine_id: &RoutineId, key: &str, value: Value) {
        self.0
            .entry(routine_id.clone())
            .or_default()
            .insert(key.to_string(), value);
    }

    #[must_use]
    pub fn get(&self, routine_id: &RoutineId, key: &str) -> Option<&Value> {
        self.0.get(routine_id).and_then(|entries| entries.get(key))
    }

    #[must_use]
    pub fn contains(&self, routine_id: &RoutineId, key: &str) -> bool {
        self.get(routine_id, key).is_some()
    }

    /// Drop everything captured for a routine.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove_routine(&mut self, routine_id: &RoutineId) -> bool {
        self.0.remove(routine_id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
