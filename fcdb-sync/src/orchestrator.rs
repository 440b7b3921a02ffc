//! Sync orchestrator
//!
//! Drives one run end to end:
//! `Fetching -> Extracting -> Resolving -> Mapping -> Upserting -> Done`,
//! with `Failed` reachable from every step. Nothing between steps is
//! persisted; a run that dies is restarted from `Fetching`.
//!
//! Runs share no in-process state. Two runs for different families touch
//! disjoint tables; two runs for the same family race, and the idempotent
//! upsert makes them converge.

use chrono::Utc;
use fcdb_common::events::{EventBus, SyncEvent};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::extract::{extract_listing, extractor, Extraction};
use crate::localization::{LocalizationResolver, SqliteDictionary};
use crate::mapper::map_all;
use crate::provider::{fetch_pages, payload, PagePlan, ProviderClient, ProviderSource};
use crate::report::SyncReport;
use crate::types::{FamilySource, SyncMode, SyncRequest, SyncState, SyncTarget};
use crate::upsert::{upsert_batches, RecordSink, SqliteRecordSink};

/// End-to-end sync pipeline
pub struct SyncPipeline {
    provider: Arc<dyn ProviderSource>,
    resolver: LocalizationResolver,
    sink: Arc<dyn RecordSink>,
    settings: Arc<SyncSettings>,
    event_bus: EventBus,
    /// Run history; `None` keeps runs in memory only
    history: Option<SqlitePool>,
}

impl SyncPipeline {
    pub fn new(
        provider: Arc<dyn ProviderSource>,
        resolver: LocalizationResolver,
        sink: Arc<dyn RecordSink>,
        settings: Arc<SyncSettings>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            provider,
            resolver,
            sink,
            settings,
            event_bus,
            history: None,
        }
    }

    /// Record every run in `sync_runs`
    pub fn with_history(mut self, pool: SqlitePool) -> Self {
        self.history = Some(pool);
        self
    }

    /// Production wiring: HTTP provider, SQLite dictionary, SQLite tables
    pub fn from_pool(
        pool: SqlitePool,
        settings: Arc<SyncSettings>,
        event_bus: EventBus,
    ) -> fcdb_common::Result<Self> {
        let provider = Arc::new(ProviderClient::new(&settings.provider)?);
        let resolver = LocalizationResolver::new(
            Arc::new(SqliteDictionary::new(pool.clone())),
            settings.missing_key_sample,
        );
        let sink = Arc::new(SqliteRecordSink::new(pool.clone()));

        Ok(Self::new(provider, resolver, sink, settings, event_bus).with_history(pool))
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one sync to completion or failure
    ///
    /// Never returns an error: failures end up in the report as `Failed`.
    pub async fn run(&self, target: SyncTarget, request: SyncRequest) -> SyncReport {
        let mut report = SyncReport::start(Uuid::new_v4(), target, request.mode);

        info!(
            run_id = %report.run_id,
            target = %target,
            mode = request.mode.as_str(),
            "Sync run started"
        );
        self.event_bus.emit_lossy(SyncEvent::RunStarted {
            run_id: report.run_id,
            target: target.to_string(),
            mode: request.mode.as_str().to_string(),
            timestamp: Utc::now(),
        });
        self.record(&report).await;

        match self.execute(target, &request, &mut report).await {
            Ok(()) => {
                let previous = report.state;
                report.finish();
                self.emit_state_change(&report, previous);
                info!(
                    run_id = %report.run_id,
                    target = %target,
                    discovered = report.discovered(),
                    upserted = report.upserted(),
                    translated = report.translated,
                    fallbacks = report.fallbacks,
                    duration_ms = report.duration_ms,
                    "Sync run done"
                );
                self.event_bus.emit_lossy(SyncEvent::RunCompleted {
                    run_id: report.run_id,
                    target: target.to_string(),
                    discovered: report.discovered(),
                    upserted: report.upserted(),
                    fallbacks: report.fallbacks,
                    duration_ms: report.duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                let failed_in = report.state;
                report.fail(&e);
                self.emit_state_change(&report, failed_in);
                error!(
                    run_id = %report.run_id,
                    target = %target,
                    failed_in = %failed_in,
                    committed = report.upserted(),
                    error = %e,
                    "Sync run failed"
                );
                self.event_bus.emit_lossy(SyncEvent::RunFailed {
                    run_id: report.run_id,
                    target: target.to_string(),
                    failed_in: failed_in.to_string(),
                    error: e.to_string(),
                    committed: report.upserted(),
                    timestamp: Utc::now(),
                });
            }
        }

        self.record(&report).await;
        report
    }

    async fn execute(
        &self,
        target: SyncTarget,
        request: &SyncRequest,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let families = target.families();

        // Fetching
        let pages = self.fetch(target, request).await?;
        report.pages_fetched = pages.len() as u32;

        // Extracting
        self.transition(report, SyncState::Extracting);
        let extraction = extract_pages(target, &pages)?;
        drop(pages);

        for family in &families {
            report.counts_mut(*family).discovered = extraction.count(*family);
        }
        report.duplicates_replaced = extraction.replaced();
        report.duplicates_conflicting = extraction.conflicting();
        if extraction.conflicting() > 0 {
            warn!(
                run_id = %report.run_id,
                conflicting = extraction.conflicting(),
                "Provider document contains conflicting duplicate ids"
            );
        }

        // Resolving
        self.transition(report, SyncState::Resolving);
        let keys = extraction.localization_keys(&families);
        let names = tokio::time::timeout(self.settings.step_timeout, self.resolver.resolve(&keys))
            .await
            .map_err(|_| SyncError::Timeout {
                step: SyncState::Resolving,
                after: self.settings.step_timeout,
            })??;
        report.translated = names.translated();
        report.fallbacks = names.fallbacks();
        report.missing_keys = names.missing_sample().to_vec();

        // Mapping
        self.transition(report, SyncState::Mapping);
        let synced_at = Utc::now();
        let mapped: Vec<_> = families
            .iter()
            .map(|family| (*family, map_all(extraction.family(*family), &names, synced_at)))
            .collect();

        // Upserting
        self.transition(report, SyncState::Upserting);
        for (family, records) in mapped {
            let batch_size = self.settings.family(family).batch_size;
            report.counts_mut(family).attempted = records.len();

            match upsert_batches(
                self.sink.as_ref(),
                family,
                &records,
                batch_size,
                self.settings.step_timeout,
            )
            .await
            {
                Ok(summary) => {
                    let counts = report.counts_mut(family);
                    counts.upserted = summary.committed;
                    counts.batches = summary.batches;
                }
                Err(e) => {
                    report.counts_mut(family).upserted = e.committed();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn fetch(
        &self,
        target: SyncTarget,
        request: &SyncRequest,
    ) -> Result<Vec<Value>, SyncError> {
        if request.max_pages == Some(0) {
            return Err(SyncError::InvalidRequest(
                "maxPages must be at least 1".to_string(),
            ));
        }

        match target {
            SyncTarget::Metadata => {
                let endpoint = self.settings.metadata_endpoint();
                fetch_pages(self.provider.as_ref(), &endpoint, PagePlan::Single).await
            }
            SyncTarget::Family(family) => {
                let family_settings = self.settings.family(family);
                let plan = self.page_plan(family_settings.paginated, request);
                fetch_pages(self.provider.as_ref(), &family_settings.endpoint, plan).await
            }
        }
    }

    fn page_plan(&self, paginated: bool, request: &SyncRequest) -> PagePlan {
        if !paginated {
            return PagePlan::Single;
        }

        let max_pages = match request.mode {
            SyncMode::Test => 1,
            SyncMode::Full => request
                .max_pages
                .unwrap_or(self.settings.provider.default_max_pages),
        };

        PagePlan::Paged {
            max_pages,
            delay: self.settings.provider.page_delay,
        }
    }

    fn transition(&self, report: &mut SyncReport, next: SyncState) {
        let previous = report.state;
        report.state = next;
        debug!(run_id = %report.run_id, from = %previous, to = %next, "Sync state change");
        self.emit_state_change(report, previous);
    }

    fn emit_state_change(&self, report: &SyncReport, previous: SyncState) {
        self.event_bus.emit_lossy(SyncEvent::StateChanged {
            run_id: report.run_id,
            target: report.target.clone(),
            old_state: previous.to_string(),
            new_state: report.state.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Persist the run row; history failures never fail the run
    async fn record(&self, report: &SyncReport) {
        if let Some(pool) = &self.history {
            if let Err(e) = crate::db::runs::save_run(pool, report).await {
                warn!(run_id = %report.run_id, error = %e, "Failed to record sync run");
            }
        }
    }
}

/// Extract the target's families from fetched payloads
fn extract_pages(target: SyncTarget, pages: &[Value]) -> Result<Extraction, SyncError> {
    let mut extraction = Extraction::new();

    for page in pages {
        payload::expect_container(page)?;
    }

    match (target, target.source()) {
        (SyncTarget::Family(family), FamilySource::Listing) => {
            for page in pages {
                extract_listing(page, family, &mut extraction);
            }
        }
        _ => {
            for page in pages {
                extractor::extract_into(page, &mut extraction);
            }
            extraction.retain_families(&target.families());
        }
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Family;
    use serde_json::json;

    #[test]
    fn test_extract_pages_keeps_only_target_families() {
        let document = json!({
            "clubs": [{ "id": 1, "name": "TeamName_1" }],
            "leagues": [{ "id": 13, "name": "LeagueName_13" }]
        });

        let extraction =
            extract_pages(SyncTarget::Family(Family::League), &[document.clone()]).unwrap();
        assert_eq!(extraction.count(Family::League), 1);
        assert_eq!(extraction.count(Family::Club), 0);

        let extraction = extract_pages(SyncTarget::Metadata, &[document]).unwrap();
        assert_eq!(extraction.total(), 2);
    }

    #[test]
    fn test_extract_pages_listing_across_pages() {
        let pages = vec![
            json!([{ "id": 1, "name": "TraitName_1" }]),
            json!([{ "id": 2, "name": "TraitName_2" }, { "id": 1, "name": "TraitName_1b" }]),
        ];
        let extraction = extract_pages(SyncTarget::Family(Family::Trait), &pages).unwrap();

        assert_eq!(extraction.count(Family::Trait), 2);
        assert_eq!(extraction.replaced(), 1);
    }

    #[test]
    fn test_scalar_payload_is_a_parse_error() {
        let result = extract_pages(SyncTarget::Metadata, &[json!(12)]);
        assert!(matches!(result, Err(SyncError::Parse { .. })));
    }
}
