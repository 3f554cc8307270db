//! Payload sanitization: raw JSON rows to typed [`LabRecord`]s.
//!
//! Every field that does not make it into the record is reported with a
//! reason. Dropping (unknown key, null, NaN) keeps the record usable;
//! a value that cannot be coerced to a number rejects the whole record.

use serde_json::{Map, Value};

use super::lab::{feature_index, LabRecord};

/// Why a field was left out of a sanitized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Key is not one of the model features.
    UnknownField,
    /// Value is `null`.
    Missing,
    /// Value coerces to NaN.
    NotANumber,
    /// Value cannot be coerced to a finite number.
    Invalid(String),
}

/// A single field left out of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRejection {
    pub field: String,
    pub reason: RejectionReason,
}

impl FieldRejection {
    fn new(field: &str, reason: RejectionReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }

    /// Whether this rejection invalidates the record (as opposed to a drop).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.reason, RejectionReason::Invalid(_))
    }
}

impl std::fmt::Display for FieldRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RejectionReason::UnknownField => write!(f, "{}: not a model feature", self.field),
            RejectionReason::Missing => write!(f, "{}: value is null", self.field),
            RejectionReason::NotANumber => write!(f, "{}: value is NaN", self.field),
            RejectionReason::Invalid(value) => {
                write!(f, "{}: cannot convert {} to a number", self.field, value)
            }
        }
    }
}

/// A record that passed sanitization, with the fields that were dropped.
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub record: LabRecord,
    pub dropped: Vec<FieldRejection>,
}

/// Sanitized batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct SanitizedBatch {
    pub records: Vec<LabRecord>,
    /// Dropped fields, keyed by record index (0-based).
    pub dropped: Vec<(usize, FieldRejection)>,
}

/// A batch with at least one record that could not be sanitized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", describe_rejections(.records))]
pub struct BatchRejection {
    /// Rejected records: 0-based index and the fatal field rejections.
    pub records: Vec<(usize, Vec<FieldRejection>)>,
}

fn describe_rejections(records: &[(usize, Vec<FieldRejection>)]) -> String {
    let parts: Vec<String> = records
        .iter()
        .map(|(index, rejections)| {
            let reasons: Vec<String> = rejections.iter().map(ToString::to_string).collect();
            format!("record {}: {}", index + 1, reasons.join(", "))
        })
        .collect();
    format!("Invalid lab records ({})", parts.join("; "))
}

/// Coerce a JSON value to `f64`.
///
/// Numbers are taken as-is, numeric strings are parsed after trimming,
/// booleans map to 1.0/0.0. `Ok(None)` means the value is null.
fn coerce(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| n.to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{s:?}")),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Value::Array(_) => Err("an array".to_string()),
        Value::Object(_) => Err("an object".to_string()),
    }
}

/// Sanitize one raw row.
///
/// # Errors
/// Returns every field whose value could not be coerced to a finite number.
pub fn sanitize_record(raw: &Map<String, Value>) -> Result<Sanitized, Vec<FieldRejection>> {
    let mut record = LabRecord::new();
    let mut dropped = Vec::new();
    let mut invalid = Vec::new();

    for (key, value) in raw {
        if feature_index(key).is_none() {
            dropped.push(FieldRejection::new(key, RejectionReason::UnknownField));
            continue;
        }

        match coerce(value) {
            Ok(None) => dropped.push(FieldRejection::new(key, RejectionReason::Missing)),
            Ok(Some(v)) if v.is_nan() => {
                dropped.push(FieldRejection::new(key, RejectionReason::NotANumber));
            }
            Ok(Some(v)) if v.is_infinite() => invalid.push(FieldRejection::new(
                key,
                RejectionReason::Invalid(value.to_string()),
            )),
            Ok(Some(v)) => {
                record.set(key, v);
            }
            Err(shown) => {
                invalid.push(FieldRejection::new(key, RejectionReason::Invalid(shown)));
            }
        }
    }

    if invalid.is_empty() {
        Ok(Sanitized { record, dropped })
    } else {
        Err(invalid)
    }
}

/// Sanitize every row of a batch.
///
/// # Errors
/// Returns [`BatchRejection`] listing each record that failed, if any did.
pub fn sanitize_batch(rows: &[Map<String, Value>]) -> Result<SanitizedBatch, BatchRejection> {
    let mut batch = SanitizedBatch::default();
    let mut rejected = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match sanitize_record(row) {
            Ok(sanitized) => {
                batch.records.push(sanitized.record);
                batch
                    .dropped
                    .extend(sanitized.dropped.into_iter().map(|d| (index, d)));
            }
            Err(rejections) => rejected.push((index, rejections)),
        }
    }

    if rejected.is_empty() {
        Ok(batch)
    } else {
        Err(BatchRejection { records: rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lab::FEATURE_NAMES;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_keeps_only_allow_listed_numeric_fields() {
        let raw = row(json!({
            "Age": 67,
            "Temp": "34.5",
            "HeartRate": null,
            "PatientName": "Jane Doe",
            "Gender": true,
            "pH": 7.31
        }));

        let sanitized = sanitize_record(&raw).expect("Should sanitize");
        let record = &sanitized.record;

        assert_eq!(record.get("Age"), Some(67.0));
        assert_eq!(record.get("Temp"), Some(34.5));
        assert_eq!(record.get("Gender"), Some(1.0));
        assert_eq!(record.get("pH"), Some(7.31));
        assert_eq!(record.get("HeartRate"), None);
        assert_eq!(record.len(), 4);

        for (name, value) in record.iter() {
            assert!(FEATURE_NAMES.contains(&name));
            assert!(!value.is_nan());
        }

        assert!(sanitized
            .dropped
            .contains(&FieldRejection::new("HeartRate", RejectionReason::Missing)));
        assert!(sanitized
            .dropped
            .contains(&FieldRejection::new("PatientName", RejectionReason::UnknownField)));
    }

    #[test]
    fn test_nan_string_is_dropped() {
        let raw = row(json!({ "Lactate": "NaN", "WBC": " 12.5 " }));
        let sanitized = sanitize_record(&raw).expect("Should sanitize");

        assert_eq!(sanitized.record.get("Lactate"), None);
        assert_eq!(sanitized.record.get("WBC"), Some(12.5));
        assert_eq!(
            sanitized.dropped,
            vec![FieldRejection::new("Lactate", RejectionReason::NotANumber)]
        );
    }

    #[test]
    fn test_invalid_literal_rejects_record() {
        let raw = row(json!({
            "Age": 50,
            "Temp": "warm",
            "Platelets": [150, 160],
            "Glucose": "inf"
        }));

        let rejections = sanitize_record(&raw).expect_err("Should reject");
        assert_eq!(rejections.len(), 3);
        assert!(rejections.iter().all(FieldRejection::is_fatal));
        assert!(rejections.iter().any(|r| r.field == "Temp"));
        assert!(rejections.iter().any(|r| r.field == "Platelets"));
        assert!(rejections.iter().any(|r| r.field == "Glucose"));
    }

    #[test]
    fn test_unknown_invalid_value_is_only_dropped() {
        // Unknown keys never reach coercion.
        let raw = row(json!({ "Notes": "see chart", "Age": 30 }));
        let sanitized = sanitize_record(&raw).expect("Should sanitize");
        assert_eq!(sanitized.record.len(), 1);
    }

    #[test]
    fn test_batch_rejection_names_records() {
        let rows = vec![
            row(json!({ "Age": 50 })),
            row(json!({ "Age": "old" })),
            row(json!({ "Temp": 36.0 })),
        ];

        let err = sanitize_batch(&rows).expect_err("Should reject batch");
        assert_eq!(err.records.len(), 1);
        assert_eq!(err.records[0].0, 1);

        let message = err.to_string();
        assert!(message.contains("record 2"));
        assert!(message.contains("Age"));
    }

    #[test]
    fn test_batch_preserves_order_and_drops() {
        let rows = vec![
            row(json!({ "Age": 50, "Bed": 4 })),
            row(json!({ "Temp": 36.0 })),
        ];

        let batch = sanitize_batch(&rows).expect("Should sanitize batch");
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].get("Age"), Some(50.0));
        assert_eq!(batch.records[1].temperature(), Some(36.0));
        assert_eq!(batch.dropped.len(), 1);
        assert_eq!(batch.dropped[0].0, 0);
    }
}
