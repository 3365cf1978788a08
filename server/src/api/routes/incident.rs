//! Incident submission

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;

use crate::api::{ApiError, ApiState};
use crate::data::sqlite::repositories::incident as incident_repo;
use crate::domain::Incident;

const API_KEY_HEADER: &str = "x-api-key";

/// `POST /api/incident`
///
/// Requires `X-API-Key` when the server has one configured. Incidents dated
/// in the future are stored as scheduled.
pub async fn submit(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(incident): Json<Incident>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;

    incident.validate()?;

    if !state.knows(&incident.monitor_id) {
        return Err(ApiError::bad_request(
            "monitor_id is not in the list of monitors",
        ));
    }

    incident_repo::insert(state.store.pool(), &incident, Utc::now())
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(serde_json::json!({ "message": "success" })))
}

fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.api_key else {
        return Ok(());
    };

    match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        None => Err(ApiError::unauthorized("api key is required")),
        Some(provided) if provided != expected => {
            Err(ApiError::unauthorized("api key is invalid"))
        }
        Some(_) => Ok(()),
    }
}
