//! Per-endpoint field-whitelist enforcement.
//!
//! Create bodies must carry exactly the required field set; patch bodies
//! must be a subset of the mutable fields (empty allowed). Violations
//! reject with the endpoint's validation message before any domain logic
//! runs.

use serde_json::{Map, Value};

use crate::error::ApiError;

/// The body must be an object whose key set is exactly `fields`.
pub fn exact_fields<'a>(
    body: &'a Value,
    fields: &[&str],
    message: &str,
) -> Result<&'a Map<String, Value>, ApiError> {
    let object = body.as_object().ok_or_else(|| ApiError::validation(message))?;
    if object.len() != fields.len() || !fields.iter().all(|f| object.contains_key(*f)) {
        return Err(ApiError::validation(message));
    }
    Ok(object)
}

/// The body must be an object whose keys all come from `fields`.
pub fn subset_fields<'a>(
    body: &'a Value,
    fields: &[&str],
    message: &str,
) -> Result<&'a Map<String, Value>, ApiError> {
    let object = body.as_object().ok_or_else(|| ApiError::validation(message))?;
    if !object.keys().all(|key| fields.contains(&key.as_str())) {
        return Err(ApiError::validation(message));
    }
    Ok(object)
}

/// Required string value for `key`.
pub fn string_field(
    object: &Map<String, Value>,
    key: &str,
    message: &str,
) -> Result<String, ApiError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation(message))
}

/// Optional string value for `key`; present-but-not-a-string rejects.
pub fn optional_string_field(
    object: &Map<String, Value>,
    key: &str,
    message: &str,
) -> Result<Option<String>, ApiError> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ApiError::validation(message)),
    }
}
