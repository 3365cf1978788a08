//! Live result streams
//!
//! Long-lived SSE responses fed by the broker. The first frame greets the
//! client, every following frame is one probe result. The stream closes
//! silently on shutdown or client disconnect; a lagging connection drops
//! the oldest results instead of being cut off.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;

use crate::api::{ApiError, ApiState};
use crate::core::constants::SSE_KEEP_ALIVE_SECS;
use crate::data::broker::Subscriber;

#[derive(Debug, Deserialize)]
pub struct ByQuery {
    pub ids: Option<String>,
}

/// `GET /api/overview`: every monitor's live results
pub async fn overview(
    State(state): State<ApiState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let ids = state.monitor_ids();
    stream_results(&state, &ids)
}

/// `GET /api/by?ids=a,b,c`: live results for the listed monitors only
pub async fn by(
    State(state): State<ApiState>,
    Query(query): Query<ByQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let raw = query
        .ids
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("ids is required"))?;
    let ids = parse_ids(raw, &state)?;
    stream_results(&state, &ids)
}

fn parse_ids(raw: &str, state: &ApiState) -> Result<Vec<String>, ApiError> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ApiError::bad_request("ids is required"));
    }

    for id in &ids {
        if !state.knows(id) {
            return Err(ApiError::bad_request(format!(
                "id '{}' is not in the list of monitors",
                id
            )));
        }
    }

    Ok(ids)
}

fn stream_results(
    state: &ApiState,
    ids: &[String],
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscriber = Subscriber::new(&state.broker, ids)?;
    let mut shutdown_rx = state.shutdown_rx.clone();

    let stream = async_stream::stream! {
        yield Ok(Event::default().data(serde_json::json!({"type": "hello"}).to_string()));

        let mut results = Box::pin(subscriber.listen());

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                item = results.next() => {
                    match item {
                        Some(result) => match serde_json::to_string(&result) {
                            Ok(data) => yield Ok(Event::default().data(data)),
                            Err(e) => {
                                tracing::error!(error = %e, "failed to serialize SSE result");
                            }
                        },
                        None => break,
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}
