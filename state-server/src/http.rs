//! HTTP document API
//!
//! The same surface the viewer core's `RemoteStateStore` speaks against the
//! managed backend: one playback-state document per event, fetched and
//! replaced whole.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use stagepass_core::{EventId, PlaybackSnapshot};

use crate::metrics::Metrics;
use crate::store::DocumentStore;

pub fn router(store: Arc<DocumentStore>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route(
            "/v1/events/:event_id/playback",
            get(get_playback).put(put_playback),
        )
        .with_state(store)
}

/// Bind and serve until the process exits.
pub async fn serve(
    listen_addr: &str,
    store: Arc<DocumentStore>,
    metrics: Arc<RwLock<Metrics>>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    metrics.write().server_started(listen_addr.to_string());
    info!("state server listening on {}", listen_addr);

    axum::serve(listener, router(store)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn get_playback(
    State(store): State<Arc<DocumentStore>>,
    Path(event_id): Path<String>,
) -> Response {
    let Some(event) = EventId::parse(&event_id) else {
        return error(StatusCode::BAD_REQUEST, "invalid event id");
    };

    match store.get(&event) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error(StatusCode::NOT_FOUND, "no playback state for this event"),
    }
}

async fn put_playback(
    State(store): State<Arc<DocumentStore>>,
    Path(event_id): Path<String>,
    Json(snapshot): Json<PlaybackSnapshot>,
) -> Response {
    let Some(event) = EventId::parse(&event_id) else {
        return error(StatusCode::BAD_REQUEST, "invalid event id");
    };

    debug!(
        "put {}: playing={} at {:.1}s",
        event, snapshot.is_playing, snapshot.current_time
    );
    store.put(&event, snapshot);
    StatusCode::NO_CONTENT.into_response()
}

/// Error body in the backend's shape, so client error mapping matches.
fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}
