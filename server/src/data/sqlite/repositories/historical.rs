//! Probe history repository: raw rows, hourly/daily rollups, retention

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::data::sqlite::StoreError;
use crate::domain::{MonitorHistorical, MonitorStatus};

const HOURLY_TABLE: &str = "monitor_historical_hourly_aggregate";
const DAILY_TABLE: &str = "monitor_historical_daily_aggregate";

const SELECT_COLUMNS: &str = "monitor_id, status, latency, timestamp, \
     additional_message, http_protocol, tls_version, tls_cipher, tls_expiry";

#[derive(sqlx::FromRow)]
struct HistoricalRow {
    monitor_id: String,
    status: i64,
    latency: i64,
    timestamp: DateTime<Utc>,
    additional_message: Option<String>,
    http_protocol: Option<String>,
    tls_version: Option<String>,
    tls_cipher: Option<String>,
    tls_expiry: Option<DateTime<Utc>>,
}

impl From<HistoricalRow> for MonitorHistorical {
    fn from(row: HistoricalRow) -> Self {
        MonitorHistorical {
            monitor_id: row.monitor_id,
            status: MonitorStatus::try_from(row.status as u8).unwrap_or(MonitorStatus::Failure),
            latency: row.latency,
            timestamp: row.timestamp,
            additional_message: row.additional_message,
            http_protocol: row.http_protocol,
            tls_version: row.tls_version,
            tls_cipher: row.tls_cipher,
            tls_expiry: row.tls_expiry,
        }
    }
}

/// Append one raw probe result
pub async fn write_raw(pool: &SqlitePool, row: &MonitorHistorical) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO monitor_historical \
         (timestamp, monitor_id, status, latency, additional_message, \
          http_protocol, tls_version, tls_cipher, tls_expiry) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(row.timestamp)
    .bind(&row.monitor_id)
    .bind(u8::from(row.status) as i64)
    .bind(row.latency)
    .bind(&row.additional_message)
    .bind(&row.http_protocol)
    .bind(&row.tls_version)
    .bind(&row.tls_cipher)
    .bind(row.tls_expiry)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent raw result for a monitor, if any
pub async fn latest_raw(
    pool: &SqlitePool,
    monitor_id: &str,
) -> Result<Option<MonitorHistorical>, StoreError> {
    let row: Option<HistoricalRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM monitor_historical \
         WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT 1"
    ))
    .bind(monitor_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// Raw results for a monitor, newest first
pub async fn read_raw(
    pool: &SqlitePool,
    monitor_id: &str,
    limit: u32,
) -> Result<Vec<MonitorHistorical>, StoreError> {
    read_table(pool, "monitor_historical", monitor_id, limit).await
}

/// Hourly rollups for a monitor, newest first
pub async fn read_hourly(
    pool: &SqlitePool,
    monitor_id: &str,
    limit: u32,
) -> Result<Vec<MonitorHistorical>, StoreError> {
    read_table(pool, HOURLY_TABLE, monitor_id, limit).await
}

/// Daily rollups for a monitor, newest first
pub async fn read_daily(
    pool: &SqlitePool,
    monitor_id: &str,
    limit: u32,
) -> Result<Vec<MonitorHistorical>, StoreError> {
    read_table(pool, DAILY_TABLE, monitor_id, limit).await
}

async fn read_table(
    pool: &SqlitePool,
    table: &str,
    monitor_id: &str,
    limit: u32,
) -> Result<Vec<MonitorHistorical>, StoreError> {
    let rows: Vec<HistoricalRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM {table} \
         WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT ?"
    ))
    .bind(monitor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Raw rows for a monitor inside `[from, to)`, newest first
pub async fn read_raw_range(
    pool: &SqlitePool,
    monitor_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<MonitorHistorical>, StoreError> {
    let rows: Vec<HistoricalRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM monitor_historical \
         WHERE monitor_id = ? AND timestamp >= ? AND timestamp < ? \
         ORDER BY timestamp DESC"
    ))
    .bind(monitor_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Replace the hourly rollup keyed by `(monitor_id, timestamp)`
pub async fn replace_hourly(pool: &SqlitePool, row: &MonitorHistorical) -> Result<(), StoreError> {
    replace_aggregate(pool, HOURLY_TABLE, row).await
}

/// Replace the daily rollup keyed by `(monitor_id, timestamp)`
pub async fn replace_daily(pool: &SqlitePool, row: &MonitorHistorical) -> Result<(), StoreError> {
    replace_aggregate(pool, DAILY_TABLE, row).await
}

/// Delete-then-insert inside one transaction so a re-run within the same
/// bucket always leaves exactly one row carrying the latest computation.
async fn replace_aggregate(
    pool: &SqlitePool,
    table: &str,
    row: &MonitorHistorical,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!(
        "DELETE FROM {table} WHERE monitor_id = ? AND timestamp = ?"
    ))
    .bind(&row.monitor_id)
    .bind(row.timestamp)
    .execute(&mut *tx)
    .await?;

    sqlx::query(&format!(
        "INSERT INTO {table} \
         (timestamp, monitor_id, status, latency, additional_message, \
          http_protocol, tls_version, tls_cipher, tls_expiry, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(row.timestamp)
    .bind(&row.monitor_id)
    .bind(u8::from(row.status) as i64)
    .bind(row.latency)
    .bind(&row.additional_message)
    .bind(&row.http_protocol)
    .bind(&row.tls_version)
    .bind(&row.tls_cipher)
    .bind(row.tls_expiry)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Rows removed by a retention sweep
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub raw: u64,
    pub hourly: u64,
    pub daily: u64,
}

impl CleanupStats {
    pub fn total(&self) -> u64 {
        self.raw + self.hourly + self.daily
    }
}

/// Delete rows older than `cutoff` from all three history tables in one
/// transaction; a failure rolls everything back.
pub async fn delete_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<CleanupStats, StoreError> {
    let mut tx = pool.begin().await?;

    let raw = sqlx::query("DELETE FROM monitor_historical WHERE timestamp < ?")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let hourly = sqlx::query(&format!("DELETE FROM {HOURLY_TABLE} WHERE timestamp < ?"))
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let daily = sqlx::query(&format!("DELETE FROM {DAILY_TABLE} WHERE timestamp < ?"))
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(CleanupStats { raw, hourly, daily })
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn row(monitor_id: &str, status: MonitorStatus, latency: i64) -> MonitorHistorical {
        MonitorHistorical {
            monitor_id: monitor_id.to_string(),
            status,
            latency,
            timestamp: Utc::now(),
            additional_message: None,
            http_protocol: None,
            tls_version: None,
            tls_cipher: None,
            tls_expiry: None,
        }
    }
}
