//! Database migration system
//!
//! Version 1 is the initial schema; future migrations get added here.

use sqlx::SqlitePool;

use super::error::StoreError;
use super::schema::{SCHEMA, SCHEMA_VERSION};

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!(version = SCHEMA_VERSION, "Initializing database schema");
        apply_initial_schema(pool).await?;
        return Ok(());
    }

    let current_version: i32 = sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
        .fetch_optional(pool)
        .await?
        .unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        tracing::debug!(version = current_version, "Database schema is up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        tracing::debug!(version, "Applying migration");
        apply_migration(pool, version).await?;
    }

    Ok(())
}

async fn apply_initial_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description) VALUES (1, ?, ?, 'Initial schema')",
    )
    .bind(SCHEMA_VERSION)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn apply_migration(_pool: &SqlitePool, version: i32) -> Result<(), StoreError> {
    match version {
        1 => Ok(()),
        _ => Err(StoreError::MigrationFailed {
            version,
            error: "unknown migration version".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let service = SqliteService::init_in_memory().await.unwrap();
        run_migrations(service.pool()).await.unwrap();
        run_migrations(service.pool()).await.unwrap();

        let version: i32 = sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_one(service.pool())
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_all_tables_exist() {
        let service = SqliteService::init_in_memory().await.unwrap();
        for table in [
            "monitor_historical",
            "monitor_historical_hourly_aggregate",
            "monitor_historical_daily_aggregate",
            "incident_data",
        ] {
            let exists: bool = sqlx::query_scalar(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
            )
            .bind(table)
            .fetch_one(service.pool())
            .await
            .unwrap();
            assert!(exists, "missing table {}", table);
        }
    }
}
