//! HTTP API handlers for fcdb-sync

pub mod health;
pub mod localization;
pub mod records;
pub mod runs;
pub mod sse;
pub mod sync;

pub use health::health_routes;
pub use localization::localization_routes;
pub use records::record_routes;
pub use runs::run_routes;
pub use sse::event_stream;
pub use sync::sync_routes;
