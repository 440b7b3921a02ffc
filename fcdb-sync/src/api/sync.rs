//! Sync trigger endpoint

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::types::{SyncRequest, SyncTarget};
use crate::AppState;

/// POST /sync/:target
///
/// Body is optional: `{ "mode": "test" | "full", "maxPages": 3 }`. The run
/// executes on its own task, so a disconnecting client does not cancel it.
/// Responds 200 on `Done`; on `Failed` the status follows the failure kind
/// (502 fetch/parse, 504 timeout, 500 store/upsert, 400 invalid request).
pub async fn trigger_sync(
    State(state): State<AppState>,
    Path(target): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let target: SyncTarget = target.parse().map_err(ApiError::NotFound)?;
    let request = parse_request(&body)?;

    info!(target = %target, mode = request.mode.as_str(), "Sync triggered over HTTP");

    let pipeline = state.pipeline.clone();
    let report = tokio::spawn(async move { pipeline.run(target, request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Sync task panicked: {}", e)))?;

    let status = match &report.failure {
        None => StatusCode::OK,
        Some(failure) => {
            warn!(run_id = %report.run_id, kind = ?failure.kind, "Sync trigger failed");
            *state.last_error.write().await = Some(report.message());
            failure.kind.status_code()
        }
    };

    Ok((status, Json(report.to_response())))
}

/// Empty or whitespace body means defaults
pub fn parse_request(body: &[u8]) -> ApiResult<SyncRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SyncRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid sync request body: {}", e)))
}

/// Build sync trigger routes
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync/:target", post(trigger_sync))
}
