//! fcdb-sync library interface
//!
//! Card metadata synchronization: fetch provider documents, discover
//! entities, resolve their localization keys and upsert them by id.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod localization;
pub mod mapper;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod types;
pub mod upsert;

pub use crate::error::{ApiError, ApiResult, SyncError};
pub use crate::orchestrator::SyncPipeline;
pub use crate::report::SyncReport;

use axum::Router;
use chrono::{DateTime, Utc};
use fcdb_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub pipeline: Arc<SyncPipeline>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last failed run, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<SyncPipeline>, event_bus: EventBus) -> Self {
        Self {
            db,
            pipeline,
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
///
/// CORS is fully permissive: the endpoints are internal admin operations.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::sync_routes())
        .merge(api::run_routes())
        .merge(api::localization_routes())
        .merge(api::record_routes())
        .merge(api::health_routes())
        .route("/sync/events", axum::routing::get(api::event_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
