//! Localization dictionary endpoints
//!
//! The import endpoint is how translations reach the dictionary; sync runs
//! only ever read it.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use fcdb_common::db::dictionary::{self, DictionaryEntry, LocalizationEntry};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Provenance tag used when the request names none
pub const DEFAULT_SOURCE: &str = "import";

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub source: Option<String>,
    pub entries: Vec<DictionaryEntry>,
}

/// POST /localization/import
///
/// Body: `{ "source": "ai-translation", "entries": [{ "key": ..., "value": ... }] }`.
/// Rejects the whole batch if any entry has a blank key or value.
pub async fn import_entries(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<Value>> {
    if request.entries.is_empty() {
        return Err(ApiError::BadRequest("No entries to import".to_string()));
    }

    let source = request
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SOURCE);

    let imported = dictionary::upsert_entries(&state.db, &request.entries, source).await?;
    info!(imported, source, "Localization entries imported over HTTP");

    Ok(Json(json!({
        "success": true,
        "imported": imported,
        "source": source,
    })))
}

/// GET /localization/:key
pub async fn get_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<LocalizationEntry>> {
    dictionary::get_entry(&state.db, &key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Localization key {}", key)))
}

/// Build localization routes
pub fn localization_routes() -> Router<AppState> {
    Router::new()
        .route("/localization/import", post(import_entries))
        .route("/localization/:key", get(get_entry))
}
