//! Mailer port: Trait for delivering reports by e-mail.

/// Errors that can occur while delivering a report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("Cannot build message: {0}")]
    Message(String),

    #[error("Mail relay error: {0}")]
    Relay(String),
}

/// A CSV report ready to be sent.
#[derive(Debug, Clone, Copy)]
pub struct ReportAttachment<'a> {
    pub subject: &'a str,
    pub file_name: &'a str,
    pub csv: &'a str,
}

/// Trait for report delivery.
pub trait ReportMailer: Send + Sync {
    /// Send the report to every configured recipient.
    ///
    /// # Errors
    /// Returns `DeliveryError` if the message cannot be built or relayed.
    fn send_report(&self, report: &ReportAttachment<'_>) -> Result<(), DeliveryError>;

    /// Recipient addresses, for display.
    fn recipients(&self) -> Vec<String>;
}
