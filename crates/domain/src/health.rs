//! Routine health: a bounded history of activation outcomes.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Setting key under which a routine's health record is kept in its
/// captured-state map.
pub const HEALTH_KEY: &str = "health_status";

/// Maximum number of history entries kept per routine.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Ok,
    Warning,
    Error,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    Activate,
    Deactivate,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: ExecutionKind,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub health: Health,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_run: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<ExecutionLog>,
}

impl HealthRecord {
    /// Fold one execution outcome into the record.
    pub fn record(
        &mut self,
        at: Timestamp,
        kind: ExecutionKind,
        status: ExecutionStatus,
        message: Option<String>,
    ) {
        self.last_run = Some(at);
        if kind == ExecutionKind::Activate {
            self.run_count += 1;
        }
        match status {
            ExecutionStatus::Success => self.health = Health::Ok,
            ExecutionStatus::Warning => self.health = Health::Warning,
            ExecutionStatus::Failure => {
                self.health = Health::Error;
                self.failure_count += 1;
                self.last_error.clone_from(&message);
            }
        }
        self.history.insert(
            0,
            ExecutionLog {
                timestamp: at,
                kind,
                status,
                message,
            },
        );
        self.history.truncate(HISTORY_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    fn at(seconds: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    #[test]
    fn should_start_unknown() {
        let record = HealthRecord::default();
        assert_eq!(record.health, Health::Unknown);
        assert!(record.history.is_empty());
    }

    #[test]
    fn should_mark_error_and_count_failure_when_activation_fails() {
        let mut record = HealthRecord::default();
        record.record(
            at(0),
            ExecutionKind::Activate,
            ExecutionStatus::Failure,
            Some("dark mode: unsupported".into()),
        );
        assert_eq!(record.health, Health::Error);
        assert_eq!(record.failure_count, 1);
        assert_eq!(record.run_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("dark mode: unsupported"));

        record.record(at(1), ExecutionKind::Deactivate, ExecutionStatus::Success, None);
        assert_eq!(record.health, Health::Ok);
        assert_eq!(record.run_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("dark mode: unsupported"));
    }

    #[test]
    fn should_count_only_activations_as_runs() {
        let mut record = HealthRecord::default();
        record.record(at(0), ExecutionKind::Check, ExecutionStatus::Warning, None);
        assert_eq!(record.run_count, 0);
        assert_eq!(record.health, Health::Warning);

        record.record(at(1), ExecutionKind::Activate, ExecutionStatus::Success, None);
        record.record(at(2), ExecutionKind::Deactivate, ExecutionStatus::Success, None);
        assert_eq!(record.run_count, 1);
        assert_eq!(record.history.len(), 3);
    }

    #[test]
    fn should_cap_history_at_fifty_entries_newest_first() {
        let mut record = HealthRecord::default();
        for i in 0..60 {
            record.record(at(i), ExecutionKind::Activate, ExecutionStatus::Success, None);
        }
        assert_eq!(record.history.len(), HISTORY_LIMIT);
        assert_eq!(record.history[0].timestamp, at(59));
        assert_eq!(record.run_count, 60);
    }

    #[test]
    fn should_serialize_timestamps_as_epoch_millis() {
        let mut record = HealthRecord::default();
        record.record(at(0), ExecutionKind::Activate, ExecutionStatus::Success, None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lastRun"], 1_700_000_000_000_i64);
        assert_eq!(json["history"][0]["type"], "activate");
        let back: HealthRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
