//! Required-field validation for resource models

use crate::{HandlerErrorCode, ProgressEvent};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The next fields are required {}", .0.join(" "))]
    MissingFields(Vec<String>),
    #[error("Model could not be inspected: {0}")]
    Unreadable(String),
}

impl From<ValidationError> for ProgressEvent {
    fn from(err: ValidationError) -> Self {
        ProgressEvent::failed(&err.to_string(), HandlerErrorCode::InvalidRequest)
    }
}

/// Check that every dotted field path (e.g. `ApiKeys.PublicKey`) is set on the model.
///
/// A field counts as set when it exists, is not null, and is not an empty string.
pub fn validate_required<M: Serialize>(fields: &[&str], model: &M) -> Result<(), ValidationError> {
    let value = serde_json::to_value(model).map_err(|e| ValidationError::Unreadable(e.to_string()))?;

    let missing: Vec<String> = fields
        .iter()
        .filter(|path| !is_present(&value, path))
        .map(|path| path.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

fn is_present(root: &Value, path: &str) -> bool {
    let mut current = root;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }

    match current {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
