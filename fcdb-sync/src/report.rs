//! Run report
//!
//! One `SyncReport` per run: what was discovered, translated and written, and
//! where the run stopped if it failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{FailureKind, SyncError};
use crate::types::{Family, SyncMode, SyncState, SyncTarget};

/// Per-family counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCounts {
    /// Distinct entities extracted
    pub discovered: usize,
    /// Records handed to the upsert executor
    pub attempted: usize,
    /// Records in committed batches
    pub upserted: usize,
    /// Batches committed
    pub batches: usize,
}

/// Failure details of a run that ended in `Failed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    /// State the run was in when it failed
    pub failed_in: SyncState,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub target: String,
    pub mode: SyncMode,
    pub state: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    pub families: BTreeMap<Family, FamilyCounts>,
    /// Distinct localization keys with a translation
    pub translated: usize,
    /// Distinct localization keys that fell back to the raw key
    pub fallbacks: usize,
    /// Sample of keys without translation
    #[serde(default)]
    pub missing_keys: Vec<String>,
    pub pages_fetched: u32,
    /// Extracted entities replaced by a later node with the same id
    pub duplicates_replaced: usize,
    /// Replacements where the two nodes differed
    pub duplicates_conflicting: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl SyncReport {
    /// Empty report for a run that is about to fetch
    pub fn start(run_id: Uuid, target: SyncTarget, mode: SyncMode) -> Self {
        Self {
            run_id,
            target: target.slug().to_string(),
            mode,
            state: SyncState::Fetching,
            failure: None,
            families: target
                .families()
                .into_iter()
                .map(|family| (family, FamilyCounts::default()))
                .collect(),
            translated: 0,
            fallbacks: 0,
            missing_keys: Vec::new(),
            pages_fetched: 0,
            duplicates_replaced: 0,
            duplicates_conflicting: 0,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
        }
    }

    pub fn counts_mut(&mut self, family: Family) -> &mut FamilyCounts {
        self.families.entry(family).or_default()
    }

    pub fn discovered(&self) -> usize {
        self.families.values().map(|c| c.discovered).sum()
    }

    /// Records committed across all families
    pub fn upserted(&self) -> usize {
        self.families.values().map(|c| c.upserted).sum()
    }

    pub fn is_success(&self) -> bool {
        self.state == SyncState::Done
    }

    /// Close the report as `Done`
    pub fn finish(&mut self) {
        self.state = SyncState::Done;
        self.stamp_end();
    }

    /// Close the report as `Failed`, remembering where and why
    pub fn fail(&mut self, error: &SyncError) {
        self.failure = Some(RunFailure {
            failed_in: self.state,
            kind: error.kind(),
            message: error.to_string(),
        });
        self.state = SyncState::Failed;
        self.stamp_end();
    }

    fn stamp_end(&mut self) {
        let now = Utc::now();
        self.duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        self.finished_at = Some(now);
    }

    /// Human-readable one-liner
    pub fn message(&self) -> String {
        match &self.failure {
            None => format!(
                "Synced {}: {} discovered, {} upserted, {} translated, {} fallbacks",
                self.target,
                self.discovered(),
                self.upserted(),
                self.translated,
                self.fallbacks
            ),
            Some(failure) => format!(
                "Sync of {} failed in {}: {}",
                self.target, failure.failed_in, failure.message
            ),
        }
    }

    /// Trigger response body
    ///
    /// Success: `{ success: true, message, runId, clubsProcessed, clubsUpserted, ... }`.
    /// Failure: `{ success: false, error, runId, state, failedIn, committed, ... }`.
    pub fn to_response(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), json!(self.is_success()));

        match &self.failure {
            None => {
                body.insert("message".into(), json!(self.message()));
            }
            Some(failure) => {
                body.insert("error".into(), json!(failure.message));
                body.insert("failedIn".into(), json!(failure.failed_in));
                body.insert("errorKind".into(), json!(failure.kind));
                body.insert("committed".into(), json!(self.upserted()));
            }
        }

        body.insert("runId".into(), json!(self.run_id));
        body.insert("target".into(), json!(self.target));
        body.insert("mode".into(), json!(self.mode));
        body.insert("state".into(), json!(self.state));

        for (family, counts) in &self.families {
            let prefix = family.report_prefix();
            body.insert(format!("{}Processed", prefix), json!(counts.discovered));
            body.insert(format!("{}Upserted", prefix), json!(counts.upserted));
        }

        body.insert("translated".into(), json!(self.translated));
        body.insert("fallbacks".into(), json!(self.fallbacks));
        body.insert("missingKeys".into(), json!(self.missing_keys));
        body.insert("pagesFetched".into(), json!(self.pages_fetched));
        body.insert("duplicatesReplaced".into(), json!(self.duplicates_replaced));
        body.insert("durationMs".into(), json!(self.duration_ms));

        Value::Object(body)
    }
}
