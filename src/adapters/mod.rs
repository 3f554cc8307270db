//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `http`: reqwest client for the prediction service
//! - `smtp`: lettre relay transport for report delivery
//! - `csv_report`: CSV export and re-import of result tables
//! - `sanitize`: credential/PII filtering for logs

pub mod csv_report;
pub mod http;
pub mod sanitize;
pub mod smtp;

pub use http::HttpPredictionClient;
pub use smtp::SmtpMailer;
