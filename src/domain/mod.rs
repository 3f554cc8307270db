//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! Sanitization is a pure function over parsed JSON.

mod lab;
mod prediction;
mod sanitize;

pub use lab::{feature_index, present_features, LabRecord, FEATURE_COUNT, FEATURE_NAMES, TEMPERATURE_FIELD};
pub use prediction::{
    patient_id, PredictionReport, PredictionSummary, ResultRow, SepsisLabel, Warning,
    LOW_TEMPERATURE_THRESHOLD,
};
pub use sanitize::{
    sanitize_batch, sanitize_record, BatchRejection, FieldRejection, RejectionReason, Sanitized,
    SanitizedBatch,
};
