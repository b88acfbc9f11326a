//! Connection pool for the document store.
//!
//! File databases run in WAL mode so the HTTP handlers can read routine
//! documents while the engine writes captured state. In-memory databases
//! keep SQLite's default journal, which is all they support.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::StorageError;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the documents live and how the pool reaches them.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:routines.db` or `sqlite::memory:`).
    pub database_url: String,
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .busy_timeout(self.busy_timeout);
        if self.is_in_memory() {
            return Ok(options);
        }
        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal))
    }

    /// Open the pool and bring the `documents` table up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for an invalid URL, a failed connection or
    /// a failed migration.
    pub async fn build(self) -> Result<Database, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .connect_with(self.connect_options()?)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(
            url = %self.database_url,
            max_connections = self.max_connections,
            "document store ready",
        );
        Ok(Database { pool })
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight writes and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("document store closed");
    }
}
