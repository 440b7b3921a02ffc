//! Batch upsert executor
//!
//! Records are written in fixed-size chunks, one transaction per chunk. The
//! first failing chunk stops the run; chunks committed before it stay
//! committed. Writes are never retried here: rerunning the sync is safe
//! because every write is an upsert by id.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::SyncError;
use crate::types::{Family, PersistedRecord, SyncState};

/// Destination of mapped records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write one chunk atomically, returning the number of records written
    async fn write_batch(
        &self,
        family: Family,
        records: &[PersistedRecord],
    ) -> Result<usize, SyncError>;
}

/// Family tables in the service database
#[derive(Clone)]
pub struct SqliteRecordSink {
    pool: SqlitePool,
}

impl SqliteRecordSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for SqliteRecordSink {
    async fn write_batch(
        &self,
        family: Family,
        records: &[PersistedRecord],
    ) -> Result<usize, SyncError> {
        Ok(crate::db::records::upsert_records(&self.pool, family, records).await?)
    }
}

/// Outcome of a fully committed upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    pub family: Family,
    pub attempted: usize,
    pub committed: usize,
    pub batches: usize,
}

/// Write `records` in chunks of `batch_size`
///
/// `None` or `Some(0)` writes everything in a single chunk. Each chunk is
/// bounded by `batch_timeout`. On failure the returned [`SyncError::Upsert`]
/// carries the number of records committed by earlier chunks.
pub async fn upsert_batches(
    sink: &dyn RecordSink,
    family: Family,
    records: &[PersistedRecord],
    batch_size: Option<usize>,
    batch_timeout: Duration,
) -> Result<UpsertSummary, SyncError> {
    let attempted = records.len();
    let chunk_len = match batch_size {
        Some(size) if size > 0 => size,
        _ => attempted.max(1),
    };

    let mut committed = 0;
    let mut batches = 0;

    for (index, chunk) in records.chunks(chunk_len).enumerate() {
        let batch = index + 1;

        let result = match tokio::time::timeout(batch_timeout, sink.write_batch(family, chunk)).await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                step: SyncState::Upserting,
                after: batch_timeout,
            }),
        };

        match result {
            Ok(written) => {
                committed += written;
                batches += 1;
                debug!(family = %family, batch, written, committed, "Batch committed");
            }
            Err(e) => {
                error!(
                    family = %family,
                    batch,
                    committed,
                    attempted,
                    error = %e,
                    "Batch upsert failed, earlier batches stay committed"
                );
                return Err(SyncError::Upsert {
                    family,
                    batch,
                    committed,
                    attempted,
                    source: Box::new(e),
                });
            }
        }
    }

    info!(family = %family, committed, batches, "Upsert complete");

    Ok(UpsertSummary {
        family,
        attempted,
        committed,
        batches,
    })
}
