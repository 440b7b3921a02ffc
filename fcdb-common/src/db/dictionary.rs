//! Localization dictionary operations
//!
//! The provider ships opaque localization keys (`TeamName_123`,
//! `LeagueName_13`, ...) instead of display text. This table maps each key to
//! its resolved text. Sync jobs only read it; the import job writes it.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Keys per `IN (...)` query, below SQLite's default bind-parameter limit
pub const LOOKUP_CHUNK_SIZE: usize = 500;

/// Persisted dictionary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationEntry {
    pub key: String,
    pub value: String,
    /// Provenance tag (e.g. `import`, `ai-translation`)
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// Entry submitted for import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: String,
    pub value: String,
}

impl DictionaryEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Insert or replace dictionary entries in one transaction
///
/// Returns the number of rows written. Entries with a blank key or value are
/// rejected before anything is written.
pub async fn upsert_entries(
    pool: &SqlitePool,
    entries: &[DictionaryEntry],
    source: &str,
) -> Result<usize> {
    if let Some(bad) = entries
        .iter()
        .find(|e| e.key.trim().is_empty() || e.value.trim().is_empty())
    {
        return Err(Error::InvalidInput(format!(
            "Dictionary entry has blank key or value (key = {:?})",
            bad.key
        )));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO localization_dictionary (key, value, source, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                source = excluded.source,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(source)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(count = entries.len(), source, "Dictionary entries imported");

    Ok(entries.len())
}

/// Look up display values for a set of keys
///
/// Only keys present in the table appear in the result.
pub async fn lookup_values(pool: &SqlitePool, keys: &[String]) -> Result<HashMap<String, String>> {
    let mut found = HashMap::with_capacity(keys.len());

    for chunk in keys.chunks(LOOKUP_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT key, value FROM localization_dictionary WHERE key IN (");
        let mut separated = builder.separated(", ");
        for key in chunk {
            separated.push_bind(key.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(pool).await?;
        for row in rows {
            found.insert(row.try_get("key")?, row.try_get("value")?);
        }
    }

    Ok(found)
}

/// Load a single entry
pub async fn get_entry(pool: &SqlitePool, key: &str) -> Result<Option<LocalizationEntry>> {
    let row = sqlx::query(
        "SELECT key, value, source, updated_at FROM localization_dictionary WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let updated_at: String = row.try_get("updated_at")?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(Some(LocalizationEntry {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                source: row.try_get("source")?,
                updated_at,
            }))
        }
        None => Ok(None),
    }
}

/// Number of dictionary rows
pub async fn count_entries(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM localization_dictionary")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
