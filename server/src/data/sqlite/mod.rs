//! SQLite database service
//!
//! Single-file embedded store for probe history, rollups and incidents:
//! WAL mode for concurrent reads during writes, in-memory temp storage, and
//! a small connection pool shared by the workers and the API.

pub mod error;
mod migrations;
pub mod repositories;
pub mod schema;

pub use error::StoreError;
pub use sqlx::SqlitePool;

use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MAX_CONNECTIONS};

/// SQLite database service
///
/// Created once at startup and shared across all modules; closed last during
/// shutdown so in-flight writers never observe a closed pool.
#[derive(Debug)]
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Open (creating if missing) the database at `db_path` and run pending
    /// migrations. DSN-style paths are rejected: this build only embeds the
    /// sqlite store.
    pub async fn init(db_path: &str) -> Result<Self, StoreError> {
        if db_path.contains("://") {
            return Err(StoreError::UnsupportedDsn(db_path.to_string()));
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(path = db_path, "SqliteService initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }

    /// In-memory database on a single pooled connection (tests only: every
    /// in-memory connection is its own database)
    #[cfg(test)]
    pub async fn init_in_memory() -> Result<Self, StoreError> {
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .journal_mode(SqliteJournalMode::Memory);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}
