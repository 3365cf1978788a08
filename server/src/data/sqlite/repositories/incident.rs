//! Incident repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::data::sqlite::StoreError;
use crate::domain::{Incident, IncidentSeverity, IncidentStatus};

#[derive(sqlx::FromRow)]
struct IncidentRow {
    monitor_id: String,
    title: String,
    description: Option<String>,
    timestamp: DateTime<Utc>,
    severity: i64,
    status: i64,
    created_by: Option<String>,
}

impl From<IncidentRow> for Incident {
    fn from(row: IncidentRow) -> Self {
        Incident {
            monitor_id: row.monitor_id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            timestamp: row.timestamp,
            severity: IncidentSeverity::try_from(row.severity as u8)
                .unwrap_or(IncidentSeverity::Informational),
            status: IncidentStatus::try_from(row.status as u8)
                .unwrap_or(IncidentStatus::Investigating),
            created_by: row.created_by.unwrap_or_default(),
        }
    }
}

/// Insert an incident. Future-dated incidents are stored as scheduled no
/// matter what status was submitted.
pub async fn insert(
    pool: &SqlitePool,
    incident: &Incident,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let status = incident.effective_status(now);

    sqlx::query(
        "INSERT INTO incident_data \
         (monitor_id, title, description, timestamp, severity, status, created_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&incident.monitor_id)
    .bind(&incident.title)
    .bind(&incident.description)
    .bind(incident.timestamp)
    .bind(u8::from(incident.severity) as i64)
    .bind(u8::from(status) as i64)
    .bind(&incident.created_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Incidents for a monitor, newest first
pub async fn list_by_monitor(
    pool: &SqlitePool,
    monitor_id: &str,
    limit: u32,
) -> Result<Vec<Incident>, StoreError> {
    let rows: Vec<IncidentRow> = sqlx::query_as(
        "SELECT monitor_id, title, description, timestamp, severity, status, created_by \
         FROM incident_data WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT ?",
    )
    .bind(monitor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use chrono::Duration;

    fn incident(ts: DateTime<Utc>, status: IncidentStatus) -> Incident {
        Incident {
            monitor_id: "m1".to_string(),
            title: "Elevated error rate".to_string(),
            description: "5xx spike".to_string(),
            timestamp: ts,
            severity: IncidentSeverity::Error,
            status,
            created_by: "ops".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_round_trip() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let now = Utc::now();

        insert(
            store.pool(),
            &incident(now - Duration::minutes(1), IncidentStatus::Identified),
            now,
        )
        .await
        .unwrap();

        let listed = list_by_monitor(store.pool(), "m1", 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, IncidentStatus::Identified);
        assert_eq!(listed[0].severity, IncidentSeverity::Error);
        assert_eq!(listed[0].created_by, "ops");
    }

    #[tokio::test]
    async fn test_future_incident_stored_as_scheduled() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let now = Utc::now();

        insert(
            store.pool(),
            &incident(now + Duration::hours(1), IncidentStatus::Investigating),
            now,
        )
        .await
        .unwrap();

        let listed = list_by_monitor(store.pool(), "m1", 10).await.unwrap();
        assert_eq!(listed[0].status, IncidentStatus::Scheduled);
    }
}
