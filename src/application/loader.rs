//! Payload loader: uploaded JSON to a raw lab batch.
//!
//! Only the envelope is checked here (top-level `sepsis_fv` array of
//! objects). Field-level checks belong to sanitization.

use std::path::Path;

use serde_json::{Map, Value};

use crate::SepsiscopeError;

/// Required top-level key of an uploaded batch.
pub const PAYLOAD_KEY: &str = "sepsis_fv";

/// Raw rows of an uploaded batch, not yet sanitized.
#[derive(Debug, Clone)]
pub struct LabBatch {
    pub rows: Vec<Map<String, Value>>,
    /// Where the batch came from (file name or "sample")
    pub source: String,
}

impl LabBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse an uploaded document.
///
/// # Errors
/// Returns `SepsiscopeError::InputValidation` if the bytes are not JSON, the
/// required key is missing, or it does not hold a non-empty array of objects.
pub fn load_payload(bytes: &[u8], source: impl Into<String>) -> Result<LabBatch, SepsiscopeError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| SepsiscopeError::InputValidation(format!("Failed to parse JSON: {e}")))?;

    let missing_key = || {
        SepsiscopeError::InputValidation(format!(
            "JSON format invalid. Must contain top-level key '{PAYLOAD_KEY}'."
        ))
    };

    let entries = match document {
        Value::Object(mut top) => match top.remove(PAYLOAD_KEY) {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(SepsiscopeError::InputValidation(format!(
                    "JSON format invalid. '{PAYLOAD_KEY}' must be an array of records."
                )))
            }
            None => return Err(missing_key()),
        },
        _ => return Err(missing_key()),
    };

    if entries.is_empty() {
        return Err(SepsiscopeError::InputValidation(format!(
            "'{PAYLOAD_KEY}' contains no records."
        )));
    }

    let rows = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(row) => Ok(row),
            other => Err(SepsiscopeError::InputValidation(format!(
                "Record {} in '{PAYLOAD_KEY}' is not an object (found {}).",
                i + 1,
                json_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let batch = LabBatch {
        rows,
        source: source.into(),
    };
    tracing::info!("Loaded lab batch with {} records", batch.len());
    Ok(batch)
}

/// Read and parse an uploaded file.
///
/// # Errors
/// Returns `SepsiscopeError::InputValidation` if the file cannot be read or
/// fails [`load_payload`].
pub fn load_payload_file(path: &Path) -> Result<LabBatch, SepsiscopeError> {
    let bytes = std::fs::read(path).map_err(|e| {
        SepsiscopeError::InputValidation(format!("Cannot read {}: {e}", path.display()))
    })?;

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    load_payload(&bytes, source)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
