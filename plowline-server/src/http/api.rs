//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use plowline_core::{Event, EventId};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Events currently retained
    pub retained_events: usize,
    /// Retention limit
    pub max_events: usize,
    /// Id of the newest event ever appended (0 before the first)
    pub last_event_id: EventId,
    /// Connected live-stream clients
    pub subscribers: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        retained_events: state.store.len().await,
        max_events: state.store.capacity(),
        last_event_id: state.store.last_id().await,
        subscribers: state.registry.len(),
    })
}

/// Paths the viewer page needs
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Where trackers POST events
    pub events_path: String,
    /// Backlog of retained events
    pub list_path: String,
    /// Live event stream
    pub stream_path: String,
}

/// Viewer configuration endpoint
pub async fn viewer_config(State(state): State<Arc<AppState>>) -> Json<ViewerConfig> {
    let events_path = state.config.events_path();
    Json(ViewerConfig {
        list_path: super::list_path(&events_path),
        stream_path: super::STREAM_PATH.to_string(),
        events_path,
    })
}

/// List every retained event, oldest first
///
/// Events are returned as stored; display shaping only applies to live pushes.
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    Json(state.store.list().await)
}
