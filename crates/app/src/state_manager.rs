//! Captured-state manager.
//!
//! Keeps the `routine-states` document in memory and writes it through to
//! the [`StateStore`] on every mutation. Captured settings are
//! first-write-wins; the health record is the one entry that is overwritten.

use std::sync::Arc;

use routines_domain::captured_state::CapturedStates;
use routines_domain::error::RoutinesError;
use routines_domain::health::{ExecutionKind, ExecutionStatus, HEALTH_KEY, HealthRecord};
use routines_domain::id::RoutineId;
use routines_domain::time::Timestamp;
use serde_json::Value;

use crate::ports::{STATES_KEY, StateStore};

pub struct StateManager<S> {
    store: Arc<S>,
    states: CapturedStates,
}

impl<S: StateStore> StateManager<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            states: CapturedStates::new(),
        }
    }

    /// Replace the in-memory map with the stored document.
    ///
    /// A document that does not parse is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn load(&mut self) -> Result<(), RoutinesError> {
        self.states = match self.store.load(STATES_KEY).await? {
            Some(document) => serde_json::from_value(document).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable captured state");
                CapturedStates::new()
            }),
            None => CapturedStates::new(),
        };
        Ok(())
    }

    /// Capture `value` for `(routine_id, key)` unless something is already
    /// captured there. Returns whether the value was stored.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_state(
        &mut self,
        routine_id: &RoutineId,
        key: &str,
        value: Value,
    ) -> Result<bool, RoutinesError> {
        if !self.states.insert_if_absent(routine_id, key, value) {
            return Ok(false);
        }
        tracing::debug!(%routine_id, key, "captured setting");
        self.persist().await?;
        Ok(true)
    }

    #[must_use]
    pub fn restore_state(&self, routine_id: &RoutineId, key: &str) -> Option<Value> {
        self.states.get(routine_id, key).cloned()
    }

    #[must_use]
    pub fn has_state(&self, routine_id: &RoutineId, key: &str) -> bool {
        self.states.contains(routine_id, key)
    }

    /// Forget everything captured for a routine, health included.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn clear_state(&mut self, routine_id: &RoutineId) -> Result<(), RoutinesError> {
        if self.states.remove_routine(routine_id) {
            self.persist().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn health(&self, routine_id: &RoutineId) -> HealthRecord {
        self.states
            .get(routine_id, HEALTH_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Append one outcome to the routine's health record.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn record_health(
        &mut self,
        routine_id: &RoutineId,
        at: Timestamp,
        kind: ExecutionKind,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Result<(), RoutinesError> {
        let mut record = self.health(routine_id);
        record.record(at, kind, status, message);
        let value = serde_json::to_value(&record)
            .map_err(|err| RoutinesError::Storage(Box::new(err)))?;
        self.states.put(routine_id, HEALTH_KEY, value);
        self.persist().await
    }

    async fn persist(&self) -> Result<(), RoutinesError> {
        let document =
            serde_json::to_value(&self.states).map_err(|err| RoutinesError::Storage(Box::new(err)))?;
        self.store.save(STATES_KEY, document).await
    }
}
