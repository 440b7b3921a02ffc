//! Family record persistence
//!
//! Writes are "insert or replace by id": every column of an existing row is
//! overwritten, so rerunning a sync converges on the provider's data.

use chrono::{DateTime, Utc};
use fcdb_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::schema;
use crate::types::{ColumnType, ColumnValue, EntityId, Family, IdKind, PersistedRecord};

/// `INSERT ... ON CONFLICT(id) DO UPDATE` for a family
pub fn upsert_sql(family: Family) -> String {
    let columns = schema::columns(family);
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns
        .iter()
        .skip(1)
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(",\n                ");

    format!(
        r#"
        INSERT INTO {table} ({columns})
        VALUES ({placeholders})
        ON CONFLICT(id) DO UPDATE SET
                {updates}
        "#,
        table = family.table(),
        columns = columns.join(", "),
    )
}

/// Upsert a slice of records in one transaction
///
/// Either every record of the slice is committed or none is. Returns the
/// number of records written.
pub async fn upsert_records(
    pool: &SqlitePool,
    family: Family,
    records: &[PersistedRecord],
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let sql = upsert_sql(family);
    let mut tx = pool.begin().await?;

    for record in records {
        if record.family != family {
            return Err(Error::InvalidInput(format!(
                "{} record {} passed to {} upsert",
                record.family, record.id, family
            )));
        }

        let raw_data = serde_json::to_string(&record.raw_data)
            .map_err(|e| Error::Internal(format!("Failed to serialize raw_data: {}", e)))?;

        let mut query = sqlx::query(&sql);
        query = match (&record.id, family.id_kind()) {
            (EntityId::Int(id), IdKind::Numeric) => query.bind(*id),
            (EntityId::Str(_), IdKind::Numeric) => {
                return Err(Error::InvalidInput(format!(
                    "{} requires a numeric id, got {:?}",
                    family, record.id
                )))
            }
            (id, _) => query.bind(id.to_string()),
        };
        query = query
            .bind(&record.display_name)
            .bind(&record.display_description)
            .bind(&record.localization_key_name)
            .bind(&record.localization_key_description)
            .bind(&record.image);

        for (column, _) in family.extra_columns() {
            query = match record.extra_value(column) {
                Some(ColumnValue::Integer(value)) => query.bind(*value),
                Some(ColumnValue::Text(value)) => query.bind(value.clone()),
                None => query.bind(Option::<String>::None),
            };
        }

        query
            .bind(raw_data)
            .bind(record.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(records.len())
}

/// Load one record by id (as it appears in a URL)
pub async fn get_record(pool: &SqlitePool, family: Family, id: &str) -> Result<Option<PersistedRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        schema::columns(family).join(", "),
        family.table()
    );

    let query = sqlx::query(&sql);
    let query = match family.id_kind() {
        IdKind::Numeric => {
            let id: i64 = id.parse().map_err(|_| {
                Error::InvalidInput(format!("{} ids are numeric, got {:?}", family, id))
            })?;
            query.bind(id)
        }
        IdKind::Text | IdKind::Either => query.bind(id.to_string()),
    };

    match query.fetch_optional(pool).await? {
        Some(row) => Ok(Some(record_from_row(family, &row)?)),
        None => Ok(None),
    }
}

/// Number of rows in a family table
pub async fn count_records(pool: &SqlitePool, family: Family) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", family.table()))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn record_from_row(family: Family, row: &SqliteRow) -> Result<PersistedRecord> {
    let id = match family.id_kind() {
        IdKind::Numeric => EntityId::Int(row.try_get("id")?),
        IdKind::Text | IdKind::Either => EntityId::Str(row.try_get("id")?),
    };

    let extra = family
        .extra_columns()
        .iter()
        .map(|(column, column_type)| -> Result<(String, ColumnValue)> {
            let value = match column_type {
                ColumnType::Integer => ColumnValue::Integer(row.try_get(*column)?),
                ColumnType::Text => ColumnValue::Text(row.try_get(*column)?),
            };
            Ok((column.to_string(), value))
        })
        .collect::<Result<Vec<_>>>()?;

    let raw_data: String = row.try_get("raw_data")?;
    let raw_data = serde_json::from_str(&raw_data)
        .map_err(|e| Error::Internal(format!("Failed to parse raw_data: {}", e)))?;

    let updated_at: String = row.try_get("updated_at")?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(PersistedRecord {
        family,
        id,
        display_name: row.try_get("display_name")?,
        display_description: row.try_get("display_description")?,
        localization_key_name: row.try_get("localization_key_name")?,
        localization_key_description: row.try_get("localization_key_description")?,
        image: row.try_get("image")?,
        extra,
        raw_data,
        updated_at,
    })
}
