//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases: load a batch, predict, export and deliver.

mod loader;
mod prediction;
mod report;
mod session;

pub use loader::{load_payload, load_payload_file, LabBatch, PAYLOAD_KEY};
pub use prediction::PredictionService;
pub use report::{report_title, DeliveryStatus, ExportOutcome, ReportService};
pub use session::{Notice, Session, SessionState};

/// In-memory port fakes shared by tests across layers.
#[cfg(test)]
pub(crate) mod fakes {
    pub(crate) use super::prediction::tests::ScriptedApi;
    pub(crate) use super::report::tests::RecordingMailer;
}
