//! SMTP adapter: Implementation of ReportMailer.
//!
//! Sends the CSV report as an attachment through an authenticated relay
//! (implicit TLS). The relay is an external service; this module only
//! builds the message and hands it over.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::MailConfig;
use crate::ports::{DeliveryError, ReportAttachment, ReportMailer};

/// Plain-text body of every report e-mail.
pub const EMAIL_BODY: &str = "Hello Doctor,\n\nPlease find the attached sepsis prediction report.";

/// Relay-backed report mailer.
pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpMailer {
    /// Build a mailer from configuration. No connection is made yet.
    ///
    /// # Errors
    /// Returns `DeliveryError::Relay` if the relay host is unusable.
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        let credentials = Credentials::new(
            config.sender.to_string(),
            config.credential.expose().to_string(),
        );

        let transport = SmtpTransport::relay(&config.relay)
            .map_err(|e| DeliveryError::Relay(e.to_string()))?
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender: Mailbox::new(None, config.sender.clone()),
            recipients: config
                .recipients
                .iter()
                .cloned()
                .map(|a| Mailbox::new(None, a))
                .collect(),
        })
    }
}

/// Build the report message.
///
/// # Errors
/// Returns `DeliveryError::Message` if the message cannot be assembled.
pub fn build_message(
    sender: &Mailbox,
    recipients: &[Mailbox],
    report: &ReportAttachment<'_>,
) -> Result<Message, DeliveryError> {
    if recipients.is_empty() {
        return Err(DeliveryError::Message("no recipients".to_string()));
    }

    let csv_type = ContentType::parse("text/csv")
        .map_err(|e| DeliveryError::Message(e.to_string()))?;

    let mut builder = Message::builder()
        .from(sender.clone())
        .subject(report.subject);
    for recipient in recipients {
        builder = builder.to(recipient.clone());
    }

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(EMAIL_BODY.to_string()))
                .singlepart(
                    Attachment::new(report.file_name.to_string())
                        .body(report.csv.to_string(), csv_type),
                ),
        )
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

impl ReportMailer for SmtpMailer {
    fn send_report(&self, report: &ReportAttachment<'_>) -> Result<(), DeliveryError> {
        let message = build_message(&self.sender, &self.recipients, report)?;

        self.transport
            .send(&message)
            .map_err(|e| DeliveryError::Relay(e.to_string()))?;

        tracing::info!("Report e-mailed to {} recipient(s)", self.recipients.len());
        Ok(())
    }

    fn recipients(&self) -> Vec<String> {
        self.recipients.iter().map(|m| m.email.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpCredential;

    fn mailbox(address: &str) -> Mailbox {
        address.parse().expect("Valid mailbox")
    }

    fn attachment() -> ReportAttachment<'static> {
        ReportAttachment {
            subject: "Prediction Results of 01-15-2025 - 01-30 PM EST",
            file_name: "Prediction Results of 01-15-2025 - 01-30 PM EST.csv",
            csv: "PatientID,Temp,SepsisPrediction,Warning\nPatient_1,34.5,Positive,Temperature is low\n",
        }
    }

    #[test]
    fn test_build_message() {
        let message = build_message(
            &mailbox("ward@hospital.org"),
            &[mailbox("icu@hospital.org"), mailbox("lab@hospital.org")],
            &attachment(),
        )
        .expect("Should build");

        let raw = String::from_utf8(message.formatted()).expect("Message should be UTF-8");
        assert!(raw.contains("icu@hospital.org"));
        assert!(raw.contains("lab@hospital.org"));
        assert!(raw.contains("text/csv"));
        assert!(raw.contains("Hello Doctor,"));
        assert!(raw.contains("attachment"));
    }

    #[test]
    fn test_build_message_requires_recipients() {
        let err = build_message(&mailbox("ward@hospital.org"), &[], &attachment())
            .expect_err("Should reject");
        assert!(matches!(err, DeliveryError::Message(_)));
    }

    #[test]
    fn test_from_config_lists_recipients() {
        let config = MailConfig {
            sender: "ward@hospital.org".parse().expect("Valid address"),
            credential: SmtpCredential::new("secret"),
            recipients: vec![
                "icu@hospital.org".parse().expect("Valid address"),
                "lab@hospital.org".parse().expect("Valid address"),
            ],
            relay: "smtp.example.org".to_string(),
        };

        let mailer = SmtpMailer::from_config(&config).expect("Should build mailer");
        assert_eq!(
            mailer.recipients(),
            vec!["icu@hospital.org".to_string(), "lab@hospital.org".to_string()]
        );
    }
}
