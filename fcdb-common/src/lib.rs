//! # FCDB Common Library
//!
//! Shared code for the card-database backend services:
//! - Error type shared by every service
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - SQLite pool initialization and the localization dictionary table
//! - Event types and the in-process event bus

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
