//! Shared test helpers: scripted provider, failing sink, pipeline builders

#![allow(dead_code)]

use async_trait::async_trait;
use fcdb_common::db::DictionaryEntry;
use fcdb_common::events::EventBus;
use fcdb_sync::config::SyncSettings;
use fcdb_sync::localization::{LocalizationResolver, SqliteDictionary};
use fcdb_sync::provider::{payload, ProviderSource};
use fcdb_sync::types::{Family, PersistedRecord};
use fcdb_sync::upsert::{RecordSink, SqliteRecordSink};
use fcdb_sync::{SyncError, SyncPipeline};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves canned response bodies per endpoint (and page)
///
/// Bodies go through the real payload decoder, so `"error"` behaves exactly
/// as it would coming from the provider.
#[derive(Default)]
pub struct FakeProvider {
    bodies: Mutex<HashMap<(String, Option<u32>), String>>,
    pub requests: Mutex<Vec<(String, Option<u32>)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, endpoint: &str, page: Option<u32>, body: impl Into<String>) -> Self {
        self.set_body(endpoint, page, body);
        self
    }

    pub fn with_json(self, endpoint: &str, value: Value) -> Self {
        self.with_body(endpoint, None, value.to_string())
    }

    pub fn set_body(&self, endpoint: &str, page: Option<u32>, body: impl Into<String>) {
        self.bodies
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), page), body.into());
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderSource for FakeProvider {
    async fn fetch(&self, endpoint: &str, page: Option<u32>) -> Result<Value, SyncError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), page));

        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(&(endpoint.to_string(), page))
            .cloned();

        match body {
            Some(body) => payload::decode_payload(&body),
            // Past the last scripted page
            None if page.is_some() => Ok(json!([])),
            None => Err(SyncError::HttpStatus {
                status: 404,
                url: endpoint.to_string(),
            }),
        }
    }
}

/// Delegates to SQLite but fails the n-th batch (1-based)
pub struct FailingSink {
    inner: SqliteRecordSink,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FailingSink {
    pub fn new(pool: SqlitePool, fail_on: usize) -> Self {
        Self {
            inner: SqliteRecordSink::new(pool),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordSink for FailingSink {
    async fn write_batch(
        &self,
        family: Family,
        records: &[PersistedRecord],
    ) -> Result<usize, SyncError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(SyncError::Store(fcdb_common::Error::Internal(
                "simulated write failure".to_string(),
            )));
        }
        self.inner.write_batch(family, records).await
    }
}

/// Settings pointing at a dummy URL, no page delay, short step timeout
pub fn test_settings() -> SyncSettings {
    let mut settings = SyncSettings::new("http://provider.test");
    settings.provider.page_delay = Duration::ZERO;
    settings.step_timeout = Duration::from_secs(5);
    settings
}

pub async fn memory_pool() -> SqlitePool {
    fcdb_sync::db::init_memory_pool().await.unwrap()
}

pub async fn seed_dictionary(pool: &SqlitePool, entries: &[(&str, &str)]) {
    let entries: Vec<DictionaryEntry> = entries
        .iter()
        .map(|(key, value)| DictionaryEntry::new(*key, *value))
        .collect();
    fcdb_common::db::dictionary::upsert_entries(pool, &entries, "test")
        .await
        .unwrap();
}

/// Pipeline over `provider`, the SQLite dictionary and `sink`
pub fn pipeline_with_sink(
    pool: &SqlitePool,
    provider: Arc<dyn ProviderSource>,
    sink: Arc<dyn RecordSink>,
    settings: SyncSettings,
    event_bus: EventBus,
) -> SyncPipeline {
    let resolver = LocalizationResolver::new(Arc::new(SqliteDictionary::new(pool.clone())), 10);
    SyncPipeline::new(provider, resolver, sink, Arc::new(settings), event_bus)
        .with_history(pool.clone())
}

/// Pipeline writing to the SQLite tables of `pool`
pub fn pipeline(pool: &SqlitePool, provider: Arc<dyn ProviderSource>) -> SyncPipeline {
    pipeline_with_sink(
        pool,
        provider,
        Arc::new(SqliteRecordSink::new(pool.clone())),
        test_settings(),
        EventBus::new(100),
    )
}

/// Nested metadata document with one entity of every universal family
pub fn metadata_document() -> Value {
    json!({
        "version": 3,
        "leagues": [
            {
                "id": 13,
                "name": "LeagueName_13",
                "nation": 14,
                "image": "https://cdn.test/leagues/13.png",
                "clubs": {
                    "items": [
                        { "id": 1, "name": "TeamName_1", "league": 13 }
                    ]
                }
            }
        ],
        "geo": { "regions": [[{ "id": 14, "name": "NationName_14" }]] },
        "programs": { "current": { "id": "TOTW", "name": "ProgramName_TOTW", "sort": 1 } },
        "labels": [{ "id": 55, "name": "RandomLabel" }]
    })
}
