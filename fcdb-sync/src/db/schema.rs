//! Table definitions for family records and run history
//!
//! Every family table shares the same leading columns; variant columns come
//! from `Family::extra_columns`.

use fcdb_common::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::types::{Family, IdKind};

/// SQLite type of a family's primary key
pub fn id_column_type(family: Family) -> &'static str {
    match family.id_kind() {
        IdKind::Numeric => "INTEGER",
        IdKind::Text | IdKind::Either => "TEXT",
    }
}

/// Column names of a family table, in insert order
pub fn columns(family: Family) -> Vec<&'static str> {
    let mut columns = vec![
        "id",
        "display_name",
        "display_description",
        "localization_key_name",
        "localization_key_description",
        "image",
    ];
    columns.extend(family.extra_columns().iter().map(|(name, _)| *name));
    columns.push("raw_data");
    columns.push("updated_at");
    columns
}

/// `CREATE TABLE` statement for a family
pub fn create_table_sql(family: Family) -> String {
    let extra: String = family
        .extra_columns()
        .iter()
        .map(|(name, column_type)| format!("            {} {},\n", name, column_type.sql()))
        .collect();

    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id {id_type} PRIMARY KEY,
            display_name TEXT NOT NULL,
            display_description TEXT,
            localization_key_name TEXT NOT NULL,
            localization_key_description TEXT,
            image TEXT,
{extra}            raw_data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        table = family.table(),
        id_type = id_column_type(family),
        extra = extra,
    )
}

/// Create every family table and `sync_runs`
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    for family in Family::ALL {
        sqlx::query(&create_table_sql(family)).execute(pool).await?;
        debug!(table = family.table(), "Ensured family table");
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_runs (
            run_id TEXT PRIMARY KEY,
            target TEXT NOT NULL,
            mode TEXT NOT NULL,
            state TEXT NOT NULL,
            report TEXT,
            error TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sync_runs_started_at ON sync_runs(started_at)")
        .execute(pool)
        .await?;

    Ok(())
}
