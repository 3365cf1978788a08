//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration to version {version} failed: {error}")]
    MigrationFailed { version: i32, error: String },

    #[error("unsupported database path '{0}': only sqlite file paths are supported")]
    UnsupportedDsn(String),
}
