//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RoutinesError`] via `#[from]`.

/// Top-level error shared by the application core and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum RoutinesError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("invalid routine configuration")]
    Hydration(#[from] HydrationError),

    #[error("import rejected")]
    Import(#[from] ImportFormatError),

    #[error("capability error")]
    Capability(#[from] CapabilityError),

    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("identifier must not be empty")]
    EmptyId,

    #[error("duplicate trigger id {0}")]
    DuplicateTriggerId(String),

    #[error("duplicate action id {0}")]
    DuplicateActionId(String),
}

/// A referenced item does not exist.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Raw configuration could not be turned into live triggers and actions.
#[derive(Debug, thiserror::Error)]
pub enum HydrationError {
    #[error("malformed routine")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown {kind} type {tag:?}")]
    UnknownType { kind: &'static str, tag: String },

    #[error("invalid config for {kind} {id}")]
    Config {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field} for {kind} {id}: {reason}")]
    InvalidValue {
        kind: &'static str,
        id: String,
        field: &'static str,
        reason: String,
    },

    #[error("invalid routine")]
    Validation(#[from] ValidationError),
}

/// An import document was rejected as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ImportFormatError {
    #[error("document is not a valid export")]
    Malformed(#[from] serde_json::Error),

    #[error("document source {found:?} is not a routines export")]
    UnexpectedSource { found: String },
}

/// The desktop capability layer refused or failed an operation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{0} is not supported on this desktop")]
    Unsupported(&'static str),

    #[error("{operation} failed: {reason}")]
    Failed {
        operation: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_routines_error() {
        let err: RoutinesError = ValidationError::EmptyName.into();
        assert!(matches!(err, RoutinesError::Validation(ValidationError::EmptyName)));
    }

    #[test]
    fn should_format_not_found_message() {
        let err = NotFoundError {
            entity: "Routine",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Routine abc not found");
    }

    #[test]
    fn should_describe_unknown_type() {
        let err = HydrationError::UnknownType {
            kind: "action",
            tag: "teleport".to_string(),
        };
        assert_eq!(err.to_string(), "unknown action type \"teleport\"");
    }
}
