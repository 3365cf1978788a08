//! Persisted history snapshots

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::{ApiError, ApiState};
use crate::core::constants::SNAPSHOT_ROW_LIMIT;
use crate::data::sqlite::repositories::historical;
use crate::domain::Monitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interval {
    Raw,
    Hourly,
    Daily,
}

impl Interval {
    fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw.unwrap_or("hourly") {
            "raw" => Ok(Interval::Raw),
            "hourly" => Ok(Interval::Hourly),
            "daily" => Ok(Interval::Daily),
            _ => Err(ApiError::bad_request(
                "interval must be hourly, daily, or raw",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    pub id: Option<String>,
    pub interval: Option<String>,
}

/// `GET /api/static?id=<opt>&interval=raw|hourly|daily`
///
/// One monitor's snapshot, or an array covering every monitor when `id` is
/// omitted. 100 rows, newest first.
pub async fn snapshot(
    State(state): State<ApiState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let interval = Interval::parse(query.interval.as_deref())?;

    match &query.id {
        Some(id) => {
            let monitor = state
                .monitor(id)
                .ok_or_else(|| ApiError::bad_request("id is not in the list of monitors"))?;
            Ok(Json(snapshot_for(&state, monitor, interval).await?))
        }
        None => {
            let mut snapshots = Vec::with_capacity(state.monitors.len());
            for monitor in state.monitors.iter() {
                snapshots.push(snapshot_for(&state, monitor, interval).await?);
            }
            Ok(Json(serde_json::Value::Array(snapshots)))
        }
    }
}

async fn snapshot_for(
    state: &ApiState,
    monitor: &Monitor,
    interval: Interval,
) -> Result<serde_json::Value, ApiError> {
    let pool = state.store.pool();
    let rows = match interval {
        Interval::Raw => historical::read_raw(pool, &monitor.id, SNAPSHOT_ROW_LIMIT).await,
        Interval::Hourly => historical::read_hourly(pool, &monitor.id, SNAPSHOT_ROW_LIMIT).await,
        Interval::Daily => historical::read_daily(pool, &monitor.id, SNAPSHOT_ROW_LIMIT).await,
    }
    .map_err(ApiError::from_store)?;

    Ok(serde_json::json!({
        "metadata": monitor.public(),
        "historical": rows,
    }))
}
