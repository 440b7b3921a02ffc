//! Database access for fcdb-sync
//!
//! Family tables and run history live in the shared SQLite database next to
//! the localization dictionary.

pub mod records;
pub mod runs;
pub mod schema;

use fcdb_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the shared database and create the sync tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = fcdb_common::db::init_database(db_path).await?;
    schema::create_tables(&pool).await?;
    Ok(pool)
}

/// In-memory database with every table, for tests and dry runs
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = fcdb_common::db::init_memory_database().await?;
    schema::create_tables(&pool).await?;
    Ok(pool)
}
