//! Prediction service: Orchestrates sanitize → remote call → result table.
//!
//! This service coordinates:
//! - Payload sanitization (typed rejections, no silent data loss)
//! - One call to the prediction port
//! - Joining labels back to records, all-or-nothing

use std::sync::Arc;

use crate::application::LabBatch;
use crate::domain::{sanitize_batch, PredictionReport};
use crate::ports::PredictionApi;
use crate::SepsiscopeError;

/// Service for running a batch through the remote model.
pub struct PredictionService<P>
where
    P: PredictionApi,
{
    api: Arc<P>,
}

impl<P> PredictionService<P>
where
    P: PredictionApi,
{
    /// Create a new prediction service.
    pub fn new(api: Arc<P>) -> Self {
        Self { api }
    }

    /// Endpoint predictions are requested from.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.api.endpoint()
    }

    /// Run the full pipeline for one batch.
    ///
    /// 1. Sanitize every record
    /// 2. Send the batch in one request
    /// 3. Check the label count against the batch size
    /// 4. Build the result table
    ///
    /// # Errors
    /// Returns `InputValidation` for rejected records, `HttpStatus`/`Network`
    /// for a failed call and `ResponseShape` for a malformed response or a
    /// label count mismatch. No partial report is ever returned.
    pub fn run(&self, batch: &LabBatch) -> Result<PredictionReport, SepsiscopeError> {
        tracing::info!("Starting prediction for {} records...", batch.len());

        let sanitized = sanitize_batch(&batch.rows)?;
        if !sanitized.dropped.is_empty() {
            tracing::info!(
                "Dropped {} field value(s) outside the model inputs during sanitization",
                sanitized.dropped.len()
            );
            for (index, rejection) in &sanitized.dropped {
                tracing::debug!("record {}: {}", index + 1, rejection);
            }
        }

        let expected = sanitized.records.len();
        let labels = self.api.predict(&sanitized.records)?;

        if labels.len() != expected {
            tracing::warn!(
                "Prediction count mismatch: {} labels for {} records",
                labels.len(),
                expected
            );
            return Err(SepsiscopeError::ResponseShape(format!(
                "Mismatch: Model returned {} predictions for {} inputs.",
                labels.len(),
                expected
            )));
        }

        let report = PredictionReport::from_predictions(sanitized.records, labels).map_err(
            |(records, labels)| {
                SepsiscopeError::ResponseShape(format!(
                    "Mismatch: Model returned {labels} predictions for {records} inputs."
                ))
            },
        )?;

        let summary = report.summary();
        tracing::info!(
            "Prediction complete: {} positive / {} negative ({:.1}% positive)",
            summary.positive,
            summary.negative,
            summary.positive_percent
        );

        Ok(report)
    }
}
