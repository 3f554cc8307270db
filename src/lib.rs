//! # Sepsiscope
//!
//! Terminal front-end for batch sepsis risk prediction.
//!
//! This crate provides:
//! - Loading and sanitizing JSON batches of patient lab values
//! - A blocking HTTP client for the remote sepsis prediction service
//! - A terminal UI rendering the risk table and a distribution donut
//! - CSV report export and e-mail delivery through an SMTP relay
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (lab records, labels, reports)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (reqwest, lettre, csv, log sanitizer)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use config::AppConfig;
pub use domain::{LabRecord, PredictionReport, ResultRow, SepsisLabel};

/// Result type for Sepsiscope operations
pub type Result<T> = std::result::Result<T, SepsiscopeError>;

/// Main error type for Sepsiscope
#[derive(Debug, thiserror::Error)]
pub enum SepsiscopeError {
    #[error("{0}")]
    InputValidation(String),

    #[error("API error {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from prediction service: {0}")]
    ResponseShape(String),

    #[error("Failed to send email: {0}")]
    Delivery(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<domain::BatchRejection> for SepsiscopeError {
    fn from(err: domain::BatchRejection) -> Self {
        Self::InputValidation(err.to_string())
    }
}

impl From<ports::PredictionError> for SepsiscopeError {
    fn from(err: ports::PredictionError) -> Self {
        match err {
            ports::PredictionError::Status { status, body } => Self::HttpStatus { status, body },
            ports::PredictionError::Transport(message) => Self::Network(message),
            ports::PredictionError::Shape(message) => Self::ResponseShape(message),
        }
    }
}

impl From<ports::DeliveryError> for SepsiscopeError {
    fn from(err: ports::DeliveryError) -> Self {
        Self::Delivery(err.to_string())
    }
}
