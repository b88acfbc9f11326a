//! Storage-specific error type wrapping sqlx errors.

use routines_domain::error::RoutinesError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored document is not valid JSON.
    #[error("JSON deserialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for RoutinesError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
