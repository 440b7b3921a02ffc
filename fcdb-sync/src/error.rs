//! Error types for fcdb-sync
//!
//! `SyncError` covers the pipeline; `ApiError` is what HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Family, SyncState};

/// Characters of an unparseable body kept for diagnostics
pub const SNIPPET_LEN: usize = 200;

/// Pipeline error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection, DNS, TLS or body-read failure
    #[error("Provider request failed: {0}")]
    Network(String),

    /// Provider answered with a non-2xx status
    #[error("Provider returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Provider answered 2xx but signalled failure in the payload
    #[error("Provider reported an error: {0}")]
    Provider(String),

    /// Body is not JSON or lacks the expected envelope
    #[error("Invalid provider response: {message} (body starts with {snippet:?})")]
    Parse { message: String, snippet: String },

    /// A blocking step exceeded its deadline
    #[error("{step} timed out after {}ms", .after.as_millis())]
    Timeout { step: SyncState, after: Duration },

    /// Dictionary or record store failure
    #[error("Store error: {0}")]
    Store(#[from] fcdb_common::Error),

    /// A batch write failed; earlier batches stay committed
    #[error("Upsert of {family} batch {batch} failed after {committed}/{attempted} records committed: {source}")]
    Upsert {
        family: Family,
        batch: usize,
        committed: usize,
        attempted: usize,
        #[source]
        source: Box<SyncError>,
    },

    /// Bad trigger parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse error class reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Parse,
    Timeout,
    Store,
    Upsert,
    InvalidRequest,
}

impl FailureKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            FailureKind::Fetch | FailureKind::Parse => StatusCode::BAD_GATEWAY,
            FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FailureKind::Store | FailureKind::Upsert => StatusCode::INTERNAL_SERVER_ERROR,
            FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }
}

impl SyncError {
    /// Parse error carrying the first [`SNIPPET_LEN`] characters of `body`
    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        SyncError::Parse {
            message: message.into(),
            snippet: body.chars().take(SNIPPET_LEN).collect(),
        }
    }

    /// Whether a fetch attempt that failed this way may be retried
    ///
    /// Network failures, fetch timeouts, 429 and 5xx are transient. Provider
    /// sentinels and parse errors will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) => true,
            SyncError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            SyncError::Timeout { step, .. } => *step == SyncState::Fetching,
            _ => false,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Network(_) | SyncError::HttpStatus { .. } | SyncError::Provider(_) => {
                FailureKind::Fetch
            }
            SyncError::Parse { .. } => FailureKind::Parse,
            SyncError::Timeout { .. } => FailureKind::Timeout,
            SyncError::Upsert { source, .. } if matches!(**source, SyncError::Timeout { .. }) => {
                FailureKind::Timeout
            }
            SyncError::Store(_) => FailureKind::Store,
            SyncError::Upsert { .. } => FailureKind::Upsert,
            SyncError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    /// Records committed before the failure (upsert failures only)
    pub fn committed(&self) -> usize {
        match self {
            SyncError::Upsert { committed, .. } => *committed,
            _ => 0,
        }
    }
}

/// API error type
///
/// Serialized as `{ "success": false, "error": "<message>" }`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// fcdb-common error
    #[error("Common error: {0}")]
    Common(#[from] fcdb_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Common(fcdb_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Common(fcdb_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
