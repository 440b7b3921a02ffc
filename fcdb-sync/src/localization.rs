//! Localization resolver
//!
//! Entity `name`/`description` fields are opaque keys. The resolver gathers
//! every key of a run into one batch, looks them up in the dictionary and
//! hands back a [`ResolvedNames`] that falls back to the raw key for misses.
//! A miss is a diagnostic, never an error; a failing dictionary is.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Read-only key → display text lookup
#[async_trait]
pub trait LocalizationSource: Send + Sync {
    /// Values for the keys that exist; absent keys are simply left out
    async fn lookup(&self, keys: &[String]) -> Result<HashMap<String, String>, SyncError>;
}

/// `localization_dictionary` table as a [`LocalizationSource`]
#[derive(Clone)]
pub struct SqliteDictionary {
    pool: SqlitePool,
}

impl SqliteDictionary {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalizationSource for SqliteDictionary {
    async fn lookup(&self, keys: &[String]) -> Result<HashMap<String, String>, SyncError> {
        Ok(fcdb_common::db::dictionary::lookup_values(&self.pool, keys).await?)
    }
}

/// Batches lookups and applies the raw-key fallback
#[derive(Clone)]
pub struct LocalizationResolver {
    source: Arc<dyn LocalizationSource>,
    missing_sample: usize,
}

impl LocalizationResolver {
    /// `missing_sample` bounds how many missing keys are kept for reporting
    pub fn new(source: Arc<dyn LocalizationSource>, missing_sample: usize) -> Self {
        Self {
            source,
            missing_sample,
        }
    }

    /// Resolve a whole run's keys with a single lookup
    pub async fn resolve(&self, keys: &BTreeSet<String>) -> Result<ResolvedNames, SyncError> {
        if keys.is_empty() {
            return Ok(ResolvedNames::default());
        }

        let requested: Vec<String> = keys.iter().cloned().collect();
        let mut values = self.source.lookup(&requested).await?;
        // A blank translation would render as an empty name
        values.retain(|_, value| !value.trim().is_empty());

        let mut missing_total = 0;
        let mut missing_sample = Vec::new();
        for key in keys.iter().filter(|key| !values.contains_key(*key)) {
            debug!(key = %key, "No translation, falling back to raw key");
            missing_total += 1;
            if missing_sample.len() < self.missing_sample {
                missing_sample.push(key.clone());
            }
        }

        if missing_total > 0 {
            warn!(
                requested = keys.len(),
                missing = missing_total,
                "Localization keys without translation"
            );
        }

        Ok(ResolvedNames {
            translated: keys.len() - missing_total,
            fallbacks: missing_total,
            missing_sample,
            values,
        })
    }
}

/// Result of one batched lookup
#[derive(Debug, Clone, Default)]
pub struct ResolvedNames {
    values: HashMap<String, String>,
    translated: usize,
    fallbacks: usize,
    missing_sample: Vec<String>,
}

impl ResolvedNames {
    /// Build directly from a key → value map (all keys count as translated)
    pub fn from_values(values: HashMap<String, String>) -> Self {
        Self {
            translated: values.len(),
            values,
            ..Default::default()
        }
    }

    /// Translation for `key`, if the dictionary has one
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Display text for `key`: the translation, or the key itself
    pub fn display(&self, key: &str) -> String {
        self.get(key).unwrap_or(key).to_string()
    }

    /// Distinct keys that had a translation
    pub fn translated(&self) -> usize {
        self.translated
    }

    /// Distinct keys that fell back to the raw key
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Bounded sample of keys without translation
    pub fn missing_sample(&self) -> &[String] {
        &self.missing_sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDictionary {
        entries: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl FakeDictionary {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LocalizationSource for FakeDictionary {
        async fn lookup(&self, keys: &[String]) -> Result<HashMap<String, String>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(keys
                .iter()
                .filter_map(|k| self.entries.get(k).map(|v| (k.clone(), v.clone())))
                .collect())
        }
    }

    struct BrokenDictionary;

    #[async_trait]
    impl LocalizationSource for BrokenDictionary {
        async fn lookup(&self, _keys: &[String]) -> Result<HashMap<String, String>, SyncError> {
            Err(SyncError::Store(fcdb_common::Error::Internal(
                "dictionary unavailable".to_string(),
            )))
        }
    }

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_with_fallback() {
        let dictionary = Arc::new(FakeDictionary::new(&[("LeagueName_EPL", "English Premier League")]));
        let resolver = LocalizationResolver::new(dictionary.clone(), 10);

        let names = resolver
            .resolve(&keys(&["LeagueName_EPL", "TeamName_Unknown"]))
            .await
            .unwrap();

        assert_eq!(names.display("LeagueName_EPL"), "English Premier League");
        assert_eq!(names.display("TeamName_Unknown"), "TeamName_Unknown");
        assert_eq!(names.get("TeamName_Unknown"), None);
        assert_eq!(names.translated(), 1);
        assert_eq!(names.fallbacks(), 1);
        assert_eq!(names.missing_sample(), ["TeamName_Unknown".to_string()]);
        assert_eq!(dictionary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_translation_falls_back_to_key() {
        let dictionary = Arc::new(FakeDictionary::new(&[
            ("TeamName_1", "Arsenal"),
            ("TeamName_2", "   "),
            ("TeamName_3", ""),
        ]));
        let resolver = LocalizationResolver::new(dictionary, 10);

        let names = resolver
            .resolve(&keys(&["TeamName_1", "TeamName_2", "TeamName_3"]))
            .await
            .unwrap();

        assert_eq!(names.display("TeamName_2"), "TeamName_2");
        assert_eq!(names.display("TeamName_3"), "TeamName_3");
        assert_eq!(names.get("TeamName_2"), None);
        assert_eq!(names.translated(), 1);
        assert_eq!(names.fallbacks(), 2);
        assert_eq!(
            names.missing_sample(),
            ["TeamName_2".to_string(), "TeamName_3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_key_set_skips_lookup() {
        let dictionary = Arc::new(FakeDictionary::new(&[]));
        let resolver = LocalizationResolver::new(dictionary.clone(), 10);

        let names = resolver.resolve(&BTreeSet::new()).await.unwrap();

        assert_eq!(names.translated(), 0);
        assert_eq!(names.fallbacks(), 0);
        assert_eq!(dictionary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_sample_is_bounded() {
        let resolver = LocalizationResolver::new(Arc::new(FakeDictionary::new(&[])), 2);

        let names = resolver
            .resolve(&keys(&["TeamName_1", "TeamName_2", "TeamName_3"]))
            .await
            .unwrap();

        assert_eq!(names.fallbacks(), 3);
        assert_eq!(names.missing_sample().len(), 2);
    }

    #[tokio::test]
    async fn test_dictionary_failure_propagates() {
        let resolver = LocalizationResolver::new(Arc::new(BrokenDictionary), 10);

        let result = resolver.resolve(&keys(&["TeamName_1"])).await;
        assert!(matches!(result, Err(SyncError::Store(_))));
    }

    #[tokio::test]
    async fn test_sqlite_dictionary_source() {
        let pool = fcdb_common::db::init_memory_database().await.unwrap();
        fcdb_common::db::dictionary::upsert_entries(
            &pool,
            &[fcdb_common::db::DictionaryEntry::new("NationName_14", "England")],
            "import",
        )
        .await
        .unwrap();

        let resolver = LocalizationResolver::new(Arc::new(SqliteDictionary::new(pool)), 10);
        let names = resolver
            .resolve(&keys(&["NationName_14", "NationName_99"]))
            .await
            .unwrap();

        assert_eq!(names.display("NationName_14"), "England");
        assert_eq!(names.display("NationName_99"), "NationName_99");
    }
}
