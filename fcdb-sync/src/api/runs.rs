//! Run history endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::runs::{self, DEFAULT_LIST_LIMIT};
use crate::error::{ApiError, ApiResult};
use crate::report::SyncReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub limit: Option<u32>,
}

/// GET /sync/runs?limit=N
///
/// Newest first; `limit` defaults to 20 and is capped at 200.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> ApiResult<Json<Vec<SyncReport>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(runs::list_runs(&state.db, limit).await?))
}

/// GET /sync/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<SyncReport>> {
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid run id: {}", run_id)))?;

    runs::load_run(&state.db, run_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Sync run {}", run_id)))
}

/// Build run history routes
pub fn run_routes() -> Router<AppState> {
    Router::new()
        .route("/sync/runs", get(list_runs))
        .route("/sync/runs/:run_id", get(get_run))
}
