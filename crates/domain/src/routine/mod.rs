//! Routine: a match policy over triggers bound to an ordered list of actions.
//!
//! A [`RoutineConfig`] is the persisted, user-authored shape. It is turned
//! into live triggers and actions by the application layer; the typed
//! [`TriggerSpec`] and [`ActionSpec`] produced here are the closed
//! construction tables that hydration goes through.

mod action;
mod trigger;

pub use action::{
    ActionConfig, ActionSpec, ActionType, ClipboardConfig, ClipboardOperation, ConnectWifi,
    DeactivatePolicy, DomainRule, OnDeactivate, Resource, SanitizeConfig, SanitizeMode,
};
pub use trigger::{
    AppCondition, BatteryCondition, BatteryStatus, BluetoothCondition, ClipboardContentType,
    ClipboardFilter, ConnectionState, LevelComparison, Schedule, SystemFlag, TimeWindow,
    TriggerConfig, TriggerSpec, TriggerStrategy, TriggerType, WifiCondition,
};

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HydrationError, RoutinesError, ValidationError};
use crate::id::RoutineId;

/// How a routine combines the results of its triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Every trigger must hold.
    #[default]
    All,
    /// At least one trigger must hold.
    Any,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// Persisted definition of a routine.
///
/// The runtime `isActive` flag is deliberately absent: it is derived by the
/// engine at each evaluation and never read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineConfig {
    pub id: RoutineId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

fn enabled_by_default() -> bool {
    true
}

impl RoutineConfig {
    /// Create a builder for constructing a [`RoutineConfig`].
    #[must_use]
    pub fn builder() -> RoutineConfigBuilder {
        RoutineConfigBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when:
    /// - `id` or `name` is blank
    /// - two triggers, or two actions, share an id
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let mut seen = HashSet::new();
        for trigger in &self.triggers {
            if !seen.insert(trigger.id.as_str()) {
                return Err(ValidationError::DuplicateTriggerId(trigger.id.to_string()));
            }
        }
        seen.clear();
        for action in &self.actions {
            if !seen.insert(action.id.as_str()) {
                return Err(ValidationError::DuplicateActionId(action.id.to_string()));
            }
        }
        Ok(())
    }
}

/// Step-by-step builder for [`RoutineConfig`].
#[derive(Debug, Default)]
pub struct RoutineConfigBuilder {
    id: Option<RoutineId>,
    name: Option<String>,
    enabled: Option<bool>,
    match_type: MatchType,
    triggers: Vec<TriggerConfig>,
    actions: Vec<ActionConfig>,
}

impl RoutineConfigBuilder {
    #[must_use]
    pub fn id(mut self, id: RoutineId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: TriggerConfig) -> Self {
        self.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionConfig) -> Self {
        self.actions.push(action);
        self
    }

    /// Consume the builder, validate, and return a [`RoutineConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`RoutinesError::Validation`] if invariants fail.
    pub fn build(self) -> Result<RoutineConfig, RoutinesError> {
        let routine = RoutineConfig {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            match_type: self.match_type,
            triggers: self.triggers,
            actions: self.actions,
        };
        routine.validate()?;
        Ok(routine)
    }
}

/// Decode a type-specific `config` payload, treating `null` as `{}`.
fn decode<T: DeserializeOwned>(
    kind: &'static str,
    id: &str,
    config: &serde_json::Value,
) -> Result<T, HydrationError> {
    let value = if config.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    serde_json::from_value(value).map_err(|source| HydrationError::Config {
        kind,
        id: id.to_string(),
        source,
    })
}

fn invalid(
    kind: &'static str,
    id: &str,
    field: &'static str,
    reason: impl fmt::Display,
) -> HydrationError {
    HydrationError::InvalidValue {
        kind,
        id: id.to_string(),
        field,
        reason: reason.to_string(),
    }
}
