//! System handlers: health, progress stream, OpenAPI.

use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// SSE event name carrying one progress line
pub const PROGRESS_EVENT: &str = "progress";

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_jobs": state.fetcher.active_jobs(),
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /progress - Server-sent progress stream
///
/// Every progress line from every running job is sent as a `progress` event
/// whose data is the raw text. Only lines published after the client
/// connects are delivered. The stream ends when the server shuts down.
#[utoipa::path(
    get,
    path = "/progress",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn progress_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let observer = state.fetcher.subscribe();
    tracing::debug!(
        observers = state.fetcher.hub().observer_count(),
        "progress client connected"
    );

    let events = observer.into_stream().filter_map(|result| match result {
        Ok(event) => Some(Ok(SseEvent::default().event(PROGRESS_EVENT).data(event.text))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            None
        }
    });

    let shutdown = state.fetcher.shutdown_token();
    let events = futures::StreamExt::take_until(events, shutdown.cancelled_owned());

    Sse::new(events).keep_alive(KeepAlive::default())
}
