//! Database access shared by FCDB services
//!
//! SQLite connection setup and tables that are owned by more than one job.

pub mod dictionary;
pub mod init;

pub use dictionary::{DictionaryEntry, LocalizationEntry};
pub use init::{init_database, init_memory_database};
