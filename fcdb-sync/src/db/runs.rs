//! Sync run history
//!
//! A row is written when a run starts and rewritten when it ends, so a crash
//! leaves the run visible in its last non-terminal state.

use fcdb_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::report::SyncReport;

/// Default and maximum page sizes for run listings
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 200;

/// Insert or update the run row for `report`
pub async fn save_run(pool: &SqlitePool, report: &SyncReport) -> Result<()> {
    let run_id = report.run_id.to_string();
    let report_json = serde_json::to_string(report)
        .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e)))?;
    let error = report.failure.as_ref().map(|f| f.message.clone());
    let started_at = report.started_at.to_rfc3339();
    let ended_at = report.finished_at.map(|dt| dt.to_rfc3339());

    sqlx::query(
        r#"
        INSERT INTO sync_runs (run_id, target, mode, state, report, error, started_at, ended_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            state = excluded.state,
            report = excluded.report,
            error = excluded.error,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(&run_id)
    .bind(&report.target)
    .bind(report.mode.as_str())
    .bind(report.state.as_str())
    .bind(&report_json)
    .bind(&error)
    .bind(&started_at)
    .bind(&ended_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one run
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<SyncReport>> {
    let row = sqlx::query("SELECT run_id, report FROM sync_runs WHERE run_id = ?")
        .bind(run_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(parse_report).transpose()
}

/// Most recent runs first, at most `limit` (clamped to [`MAX_LIST_LIMIT`])
pub async fn list_runs(pool: &SqlitePool, limit: u32) -> Result<Vec<SyncReport>> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);

    let rows = sqlx::query("SELECT run_id, report FROM sync_runs ORDER BY started_at DESC LIMIT ?")
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    rows.iter().map(parse_report).collect()
}

fn parse_report(row: &SqliteRow) -> Result<SyncReport> {
    let report: Option<String> = row.try_get("report")?;
    let report = report.ok_or_else(|| {
        let run_id: String = row.try_get("run_id").unwrap_or_default();
        Error::Internal(format!("Run {} has no stored report", run_id))
    })?;

    serde_json::from_str(&report)
        .map_err(|e| Error::Internal(format!("Failed to deserialize report: {}", e)))
}
