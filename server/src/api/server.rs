//! API server assembly

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::routes;
use super::ApiState;
use crate::core::ShutdownService;

/// Build the application router: the JSON/SSE API plus, when configured,
/// the static dashboard as fallback.
pub fn router(state: ApiState, static_path: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-api-key")]);

    let api = Router::new()
        .route("/api/overview", get(routes::sse::overview))
        .route("/api/by", get(routes::sse::by))
        .route("/api/static", get(routes::snapshot::snapshot))
        .route("/api/incident", post(routes::incident::submit))
        .route("/api/push/{id}", get(routes::push::push))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    match static_path {
        Some(path) => api.fallback_service(ServeDir::new(path)),
        None => api,
    }
}

/// Bind and serve until the shutdown signal flips. New connections stop
/// being accepted immediately; open SSE streams observe the same signal
/// through the state's watch receiver.
pub async fn serve(
    router: Router,
    hostname: &str,
    port: u16,
    shutdown: &ShutdownService,
) -> Result<()> {
    // Resolves hostnames as well as IP literals
    let listener = TcpListener::bind((hostname, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", hostname, port))?;

    let addr = listener
        .local_addr()
        .context("failed to read local address")?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.wait())
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state_with_monitors;

    #[tokio::test]
    async fn test_router_builds_without_static_dir() {
        let state = state_with_monitors(&["m1"]).await;
        let _router = router(state, None);
    }

    #[tokio::test]
    async fn test_router_builds_with_static_dir() {
        let state = state_with_monitors(&["m1"]).await;
        let dir = tempfile::tempdir().unwrap();
        let _router = router(state, Some(dir.path().to_path_buf()));
    }
}
