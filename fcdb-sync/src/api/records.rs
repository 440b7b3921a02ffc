//! Read-back of synced records

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::records;
use crate::error::{ApiError, ApiResult};
use crate::types::{Family, PersistedRecord};
use crate::AppState;

/// GET /records/:family/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path((family, id)): Path<(String, String)>,
) -> ApiResult<Json<PersistedRecord>> {
    let family: Family = family.parse().map_err(ApiError::NotFound)?;

    records::get_record(&state.db, family, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} record {}", family, id)))
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new().route("/records/:family/:id", get(get_record))
}
