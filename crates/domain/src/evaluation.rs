//! Results reported by the engine's evaluation and reload passes.

use serde::{Deserialize, Serialize};

use crate::health::HealthRecord;
use crate::id::RoutineId;
use crate::routine::RoutineConfig;

/// What one `evaluate()` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Completed {
        activated: Vec<RoutineId>,
        deactivated: Vec<RoutineId>,
    },
    /// The circuit breaker is open; no routine was visited.
    Suppressed,
}

impl EvaluationOutcome {
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

/// Diff applied by a reload, by routine id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReloadSummary {
    pub added: Vec<RoutineId>,
    pub removed: Vec<RoutineId>,
    pub replaced: Vec<RoutineId>,
}

/// A routine as seen from outside: its configuration plus runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineStatus {
    #[serde(flatten)]
    pub config: RoutineConfig,
    pub is_active: bool,
    pub health: HealthRecord,
}
