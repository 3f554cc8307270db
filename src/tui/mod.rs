//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides a medical-themed interface for:
//! - Uploading a batch of lab records
//! - Following the remote prediction
//! - Reviewing the risk table and distribution chart
//! - Exporting and e-mailing the CSV report

mod app;
mod styles;
mod ui;
mod worker;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
pub use worker::{PredictionProgress, PredictionWorker, PredictionWorkerHandle};
