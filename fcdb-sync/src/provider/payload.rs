//! Provider response decoding
//!
//! The provider answers with one of:
//! - a bare array or nested document
//! - an object with a `data` field holding the payload
//! - an object with a non-null `error` field
//! - the literal `error` (bare or as a JSON string) instead of any JSON body

use serde_json::Value;

use crate::error::SyncError;

/// Body the provider sends instead of a payload when it fails
pub const ERROR_SENTINEL: &str = "error";

/// Decode a response body into its payload
pub fn decode_payload(body: &str) -> Result<Value, SyncError> {
    let trimmed = body.trim();
    if trimmed == ERROR_SENTINEL {
        return Err(sentinel_error());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| SyncError::parse(format!("body is not JSON: {}", e), body))?;

    unwrap_envelope(value)
}

/// Strip the `data` envelope and surface in-band errors
pub fn unwrap_envelope(value: Value) -> Result<Value, SyncError> {
    match value {
        Value::String(s) if s.trim() == ERROR_SENTINEL => Err(sentinel_error()),
        Value::Object(mut map) => {
            if let Some(error) = map.get("error").filter(|e| is_error_value(e)) {
                let message = match error {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(SyncError::Provider(message));
            }

            match map.remove("data") {
                Some(Value::String(s)) if s.trim() == ERROR_SENTINEL => Err(sentinel_error()),
                Some(data) => Ok(data),
                None => Ok(Value::Object(map)),
            }
        }
        other => Ok(other),
    }
}

/// Payload of a page that ends pagination
pub fn is_empty_page(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Reject payloads that cannot contain entities
pub fn expect_container(value: &Value) -> Result<(), SyncError> {
    if value.is_array() || value.is_object() || value.is_null() {
        Ok(())
    } else {
        Err(SyncError::parse(
            "expected an array or object payload",
            &value.to_string(),
        ))
    }
}

fn is_error_value(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn sentinel_error() -> SyncError {
    SyncError::Provider(format!("provider returned the {:?} sentinel", ERROR_SENTINEL))
}
