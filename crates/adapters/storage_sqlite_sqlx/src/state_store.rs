//! `SQLite` implementation of [`StateStore`].

use routines_app::ports::StateStore;
use routines_domain::error::RoutinesError;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::StorageError;

/// `SQLite`-backed document store. Each key maps to one row.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl StateStore for SqliteStateStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, RoutinesError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let Some((raw,)) = row else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(StorageError::from)?;
        Ok(Some(value))
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), RoutinesError> {
        let raw = serde_json::to_string(&value).map_err(StorageError::from)?;
        let updated_at = routines_domain::time::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO documents (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&raw)
        .bind(&updated_at)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        tracing::trace!(key, bytes = raw.len(), "document saved");
        Ok(())
    }
}
