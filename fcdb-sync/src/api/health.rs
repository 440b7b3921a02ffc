//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (`ok` or `degraded` when the database is unreachable)
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Dictionary size, `None` when the database could not be queried
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_entries: Option<i64>,
    /// Connected `/sync/events` clients
    pub event_subscribers: usize,
    /// Message of the last failed run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let dictionary_entries = fcdb_common::db::dictionary::count_entries(&state.db)
        .await
        .ok();
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if dictionary_entries.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "fcdb-sync".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        dictionary_entries,
        event_subscribers: state.event_bus.subscriber_count(),
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
