//! Prediction port: Trait for the remote sepsis model.
//!
//! This trait abstracts the HTTP service (reqwest) from the application logic.

use crate::domain::{LabRecord, SepsisLabel};

/// Errors that can occur while calling the prediction service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredictionError {
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never got a response (DNS, connect, TLS, read).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body is not what the service contract promises.
    #[error("malformed response: {0}")]
    Shape(String),
}

/// Trait for batch sepsis prediction.
///
/// Implementations send the whole batch in one call. They return one label
/// per record, in order, or an error; there is no retry.
pub trait PredictionApi: Send + Sync {
    /// Predict sepsis risk for every record in the batch.
    ///
    /// # Errors
    /// Returns `PredictionError` if the call fails or the response is malformed.
    fn predict(&self, batch: &[LabRecord]) -> Result<Vec<SepsisLabel>, PredictionError>;

    /// Where predictions are requested from (for logs and the UI).
    fn endpoint(&self) -> &str;
}
