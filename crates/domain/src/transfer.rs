//! Import/export document.
//!
//! An export carries routine definitions without their ids or any runtime
//! state. Importing re-identifies every routine, trigger and action so an
//! imported document never collides with what is already loaded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ImportFormatError;
use crate::id::{ActionId, RoutineId, TriggerId};
use crate::routine::{ActionConfig, MatchType, RoutineConfig, TriggerConfig};
use crate::time::Timestamp;

/// Marker identifying documents produced by this engine.
pub const EXPORT_SOURCE: &str = "routines";

/// Format version written on export.
pub const EXPORT_VERSION: &str = "1.0.0";

/// A routine definition stripped of its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferredRoutine {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDocument {
    pub version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    pub source: String,
    pub routines: Vec<TransferredRoutine>,
}

impl TransferDocument {
    /// Build an export of `routines` stamped `at`.
    #[must_use]
    pub fn export(routines: &[RoutineConfig], at: Timestamp) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            timestamp: at,
            source: EXPORT_SOURCE.to_string(),
            routines: routines
                .iter()
                .map(|routine| TransferredRoutine {
                    name: routine.name.clone(),
                    enabled: routine.enabled,
                    match_type: routine.match_type,
                    triggers: routine.triggers.clone(),
                    actions: routine.actions.clone(),
                })
                .collect(),
        }
    }

    /// Parse an import document.
    ///
    /// The source marker is checked before the rest of the document, so a
    /// foreign file is reported as such even when its shape differs.
    ///
    /// # Errors
    ///
    /// Returns [`ImportFormatError::UnexpectedSource`] when `source` is not
    /// [`EXPORT_SOURCE`], and [`ImportFormatError::Malformed`] when the
    /// document does not deserialize.
    pub fn parse(value: Value) -> Result<Self, ImportFormatError> {
        match value.get("source").and_then(Value::as_str) {
            Some(EXPORT_SOURCE) => {}
            other => {
                return Err(ImportFormatError::UnexpectedSource {
                    found: other.unwrap_or_default().to_string(),
                });
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.version == EXPORT_VERSION
    }

    /// Turn the transferred routines into configs with fresh ids throughout.
    #[must_use]
    pub fn into_routines(self) -> Vec<RoutineConfig> {
        self.routines
            .into_iter()
            .map(|routine| RoutineConfig {
                id: RoutineId::new(),
                name: routine.name,
                enabled: routine.enabled,
                match_type: routine.match_type,
                triggers: routine
                    .triggers
                    .into_iter()
                    .map(|trigger| TriggerConfig {
                        id: TriggerId::new(),
                        ..trigger
                    })
                    .collect(),
                actions: routine
                    .actions
                    .into_iter()
                    .map(|action| ActionConfig {
                        id: ActionId::new(),
                        ..action
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::routine::{ActionType, TriggerType};
    use crate::time::now;

    fn sample() -> RoutineConfig {
        RoutineConfig::builder()
            .id("r1".parse().unwrap())
            .name("Night")
            .trigger(TriggerConfig::new(
                TriggerType::Time,
                json!({"startTime": "22:00", "endTime": "06:00"}),
            ))
            .action(ActionConfig::new(ActionType::NightLight, json!({"enabled": true})))
            .build()
            .unwrap()
    }

    #[test]
    fn should_strip_routine_ids_on_export() {
        let document = TransferDocument::export(&[sample()], now());
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["source"], "routines");
        assert_eq!(json["version"], "1.0.0");
        assert!(json["routines"][0].get("id").is_none());
        assert_eq!(json["routines"][0]["matchType"], "all");
    }

    #[test]
    fn should_reject_document_from_another_source() {
        let result = TransferDocument::parse(json!({
            "version": "1.0.0",
            "timestamp": 0,
            "source": "other-app",
            "routines": []
        }));
        assert!(matches!(
            result,
            Err(ImportFormatError::UnexpectedSource { found }) if found == "other-app"
        ));
    }

    #[test]
    fn should_reject_document_without_source() {
        let result = TransferDocument::parse(json!({"routines": []}));
        assert!(matches!(result, Err(ImportFormatError::UnexpectedSource { .. })));
    }

    #[test]
    fn should_report_malformed_document_with_right_source() {
        let result = TransferDocument::parse(json!({"source": "routines", "routines": "nope"}));
        assert!(matches!(result, Err(ImportFormatError::Malformed(_))));
    }

    #[test]
    fn should_assign_fresh_ids_on_import() {
        let original = sample();
        let document = TransferDocument::export(std::slice::from_ref(&original), now());
        let value = serde_json::to_value(&document).unwrap();
        let parsed = TransferDocument::parse(value).unwrap();
        assert!(parsed.is_current_version());

        let imported = parsed.into_routines();
        assert_eq!(imported.len(), 1);
        assert_ne!(imported[0].id, original.id);
        assert_ne!(imported[0].triggers[0].id, original.triggers[0].id);
        assert_ne!(imported[0].actions[0].id, original.actions[0].id);
        assert_eq!(imported[0].name, "Night");
        assert_eq!(imported[0].actions[0].config, json!({"enabled": true}));
    }
}
