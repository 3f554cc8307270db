//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (prediction service,
//! mail relay).

mod mailer;
mod prediction_api;

pub use mailer::{DeliveryError, ReportAttachment, ReportMailer};
pub use prediction_api::{PredictionApi, PredictionError};
