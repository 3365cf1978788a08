//! External push ingestion for pull monitors
//!
//! The pushed observation runs through the same processor as probed ones,
//! so persistence, transition alerts and SSE fan-out all apply.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::{ApiError, ApiState};
use crate::domain::MonitorType;
use crate::probes::ProbeResponse;

#[derive(Debug, Deserialize)]
pub struct PushQuery {
    pub status: String,
    pub msg: Option<String>,
    /// Seconds, fractional
    pub ping: Option<f64>,
    pub tls_version: Option<String>,
    pub tls_cipher: Option<String>,
    pub tls_expiry: Option<DateTime<Utc>>,
    pub http_protocol: Option<String>,
}

/// `GET /api/push/{id}?status=up|down&msg=&ping=&...`
pub async fn push(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<PushQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let monitor = state
        .monitor(&id)
        .ok_or_else(|| ApiError::not_found("id is not in the list of monitors"))?;

    if monitor.kind != MonitorType::Pull {
        return Err(ApiError::bad_request("monitor is not a pull monitor"));
    }

    let success = match query.status.as_str() {
        "up" => true,
        "down" => false,
        _ => return Err(ApiError::bad_request("status must be 'up' or 'down'")),
    };

    let mut response = ProbeResponse::for_monitor(monitor);
    response.success = success;
    response.timestamp = Utc::now();
    response.latency = query.ping.map(ping_to_millis).unwrap_or(0);
    response.additional_message = query.msg.clone().filter(|m| !m.is_empty());
    response.tls_version = query.tls_version.clone();
    response.tls_cipher = query.tls_cipher.clone();
    response.tls_expiry = query.tls_expiry;
    response.http_protocol = query.http_protocol.clone();

    state.processor.process(response).await;

    Ok(Json(serde_json::json!({ "message": "success" })))
}

/// `ping` arrives in (fractional) seconds and is stored as whole
/// milliseconds; negative values clamp to zero.
fn ping_to_millis(seconds: f64) -> i64 {
    ((seconds * 1000.0).round() as i64).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state_with_monitors;
    use crate::data::sqlite::repositories::historical;
    use crate::domain::MonitorStatus;

    fn query(status: &str, ping: Option<f64>) -> PushQuery {
        PushQuery {
            status: status.to_string(),
            msg: None,
            ping,
            tls_version: None,
            tls_cipher: None,
            tls_expiry: None,
            http_protocol: None,
        }
    }

    #[test]
    fn test_ping_to_millis() {
        assert_eq!(ping_to_millis(0.25), 250);
        assert_eq!(ping_to_millis(1.0), 1000);
        assert_eq!(ping_to_millis(0.0004), 0);
        assert_eq!(ping_to_millis(-3.0), 0);
    }

    #[tokio::test]
    async fn test_push_down_persists_a_failure() {
        let state = state_with_monitors(&["m2"]).await;
        let before = Utc::now();

        let Json(body) = push(
            State(state.clone()),
            Path("m2".to_string()),
            Query(query("down", Some(0.25))),
        )
        .await
        .unwrap();
        assert_eq!(body["message"], "success");

        let row = historical::latest_raw(state.store.pool(), "m2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, MonitorStatus::Failure);
        assert_eq!(row.latency, 250);
        assert!(row.timestamp >= before);
    }

    #[tokio::test]
    async fn test_push_feeds_the_broker() {
        let state = state_with_monitors(&["m2"]).await;
        let mut sub = state.broker.subscribe("m2");

        push(
            State(state),
            Path("m2".to_string()),
            Query(query("up", None)),
        )
        .await
        .unwrap();

        let published = sub.recv().await.unwrap();
        assert_eq!(published.body.monitor_id, "m2");
        assert_eq!(published.body.status, MonitorStatus::Success);
    }

    #[tokio::test]
    async fn test_unknown_monitor_is_not_found() {
        let state = state_with_monitors(&["m2"]).await;
        let result = push(
            State(state),
            Path("ghost".to_string()),
            Query(query("up", None)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_pull_monitor_is_rejected() {
        let state = state_with_monitors(&["m2"]).await;
        // Rebuild the monitor list with an http monitor under the same id
        let mut monitors = (*state.monitors).clone();
        monitors[0].kind = MonitorType::Http;
        let state = ApiState {
            monitors: std::sync::Arc::new(monitors),
            ..state
        };

        let result = push(
            State(state),
            Path("m2".to_string()),
            Query(query("up", None)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_bad_status_value_is_rejected() {
        let state = state_with_monitors(&["m2"]).await;
        let result = push(
            State(state),
            Path("m2".to_string()),
            Query(query("sideways", None)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
    }
}
