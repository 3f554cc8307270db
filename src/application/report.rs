//! Report service: CSV export to disk and e-mail delivery.
//!
//! The download (file on disk) always happens first. E-mail is best-effort:
//! a delivery failure is reported in the outcome and never removes or blocks
//! the exported file.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::adapters::csv_report;
use crate::domain::PredictionReport;
use crate::ports::{ReportAttachment, ReportMailer};
use crate::SepsiscopeError;

/// Title used for the results header, the e-mail subject and the file name.
#[must_use]
pub fn report_title<T>(at: &DateTime<T>) -> String
where
    T: TimeZone,
    T::Offset: std::fmt::Display,
{
    at.format("Prediction Results of %m-%d-%Y - %I-%M %p %Z")
        .to_string()
}

/// What happened to the e-mail copy of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent { recipients: Vec<String> },
    /// No mailer configured, or delivery disabled for this run.
    Skipped,
    Failed { error: String },
}

/// Result of generating a report.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub title: String,
    pub file_name: String,
    /// Where the CSV was written
    pub path: PathBuf,
    pub csv: String,
    pub delivery: DeliveryStatus,
}

/// Service for exporting and delivering reports.
pub struct ReportService<M>
where
    M: ReportMailer,
{
    mailer: Option<Arc<M>>,
    report_dir: PathBuf,
    timezone: Tz,
}

impl<M> ReportService<M>
where
    M: ReportMailer,
{
    /// Create a new report service. `mailer: None` disables e-mail.
    pub fn new(mailer: Option<Arc<M>>, report_dir: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            mailer,
            report_dir: report_dir.into(),
            timezone,
        }
    }

    #[must_use]
    pub fn email_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Export `report` titled at `at` and e-mail it if a mailer is configured.
    ///
    /// # Errors
    /// Returns an error only if the CSV cannot be produced or written.
    pub fn generate_at(
        &self,
        report: &PredictionReport,
        at: DateTime<Utc>,
        send_email: bool,
    ) -> Result<ExportOutcome, SepsiscopeError> {
        let title = report_title(&at.with_timezone(&self.timezone));
        let file_name = format!("{title}.csv");
        let csv = csv_report::to_csv(report)?;

        std::fs::create_dir_all(&self.report_dir)?;
        let path = self.report_dir.join(&file_name);
        std::fs::write(&path, &csv)?;
        tracing::info!("Saved CSV report ({} rows)", report.len());

        let delivery = match (&self.mailer, send_email) {
            (Some(mailer), true) => {
                let attachment = ReportAttachment {
                    subject: &title,
                    file_name: &file_name,
                    csv: &csv,
                };
                match mailer.send_report(&attachment) {
                    Ok(()) => DeliveryStatus::Sent {
                        recipients: mailer.recipients(),
                    },
                    Err(e) => {
                        let error = SepsiscopeError::from(e);
                        tracing::error!("{}", error);
                        DeliveryStatus::Failed {
                            error: error.to_string(),
                        }
                    }
                }
            }
            _ => DeliveryStatus::Skipped,
        };

        Ok(ExportOutcome {
            title,
            file_name,
            path,
            csv,
            delivery,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{LabRecord, SepsisLabel};
    use crate::ports::DeliveryError;
    use std::sync::Mutex;

    /// Fake mailer recording subjects and attachment names.
    pub(crate) struct RecordingMailer {
        pub(crate) fail: bool,
        pub(crate) sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        pub(crate) fn new(fail: bool) -> Self {
            Self {
                fail,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl ReportMailer for RecordingMailer {
        fn send_report(&self, report: &ReportAttachment<'_>) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Relay("535 authentication failed".to_string()));
            }
            self.sent
                .lock()
                .expect("Lock should not be poisoned")
                .push((report.subject.to_string(), report.file_name.to_string()));
            Ok(())
        }

        fn recipients(&self) -> Vec<String> {
            vec!["icu@hospital.org".to_string()]
        }
    }

    fn report() -> PredictionReport {
        let mut record = LabRecord::new();
        record.set("Temp", 34.5);
        PredictionReport::from_predictions(vec![record], vec![SepsisLabel::Positive])
            .expect("Should build report")
    }

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0)
            .single()
            .expect("Valid instant")
    }

    #[test]
    fn test_report_title() {
        let at = fixed_instant().with_timezone(&chrono_tz::US::Eastern);
        assert_eq!(
            report_title(&at),
            "Prediction Results of 01-15-2025 - 01-30 PM EST"
        );
    }

    #[test]
    fn test_generate_writes_and_sends() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mailer = Arc::new(RecordingMailer::new(false));
        let service = ReportService::new(Some(mailer.clone()), dir.path(), chrono_tz::US::Eastern);

        let outcome = service
            .generate_at(&report(), fixed_instant(), true)
            .expect("Should export");

        assert_eq!(
            outcome.file_name,
            "Prediction Results of 01-15-2025 - 01-30 PM EST.csv"
        );
        let written = std::fs::read_to_string(&outcome.path).expect("File should exist");
        assert_eq!(written, outcome.csv);
        assert!(written.starts_with("PatientID,Temp,SepsisPrediction,Warning\n"));

        assert_eq!(
            outcome.delivery,
            DeliveryStatus::Sent {
                recipients: vec!["icu@hospital.org".to_string()]
            }
        );
        let sent = mailer.sent.lock().expect("Lock should not be poisoned");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, outcome.title);
        assert_eq!(sent[0].1, outcome.file_name);
    }

    #[test]
    fn test_delivery_failure_keeps_download() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let service = ReportService::new(
            Some(Arc::new(RecordingMailer::new(true))),
            dir.path().join("nested"),
            chrono_tz::US::Eastern,
        );

        let outcome = service
            .generate_at(&report(), fixed_instant(), true)
            .expect("Export should still succeed");

        assert!(outcome.path.exists());
        match outcome.delivery {
            DeliveryStatus::Failed { error } => assert!(error.contains("authentication failed")),
            other => panic!("unexpected delivery status: {other:?}"),
        }
    }

    #[test]
    fn test_without_mailer_delivery_is_skipped() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let service: ReportService<RecordingMailer> =
            ReportService::new(None, dir.path(), chrono_tz::UTC);
        assert!(!service.email_enabled());

        let outcome = service
            .generate_at(&report(), fixed_instant(), true)
            .expect("Should export");
        assert_eq!(outcome.delivery, DeliveryStatus::Skipped);
        assert!(outcome.title.ends_with("06-30 PM UTC"));
    }

    #[test]
    fn test_email_can_be_disabled_per_run() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mailer = Arc::new(RecordingMailer::new(false));
        let service = ReportService::new(Some(mailer.clone()), dir.path(), chrono_tz::UTC);

        let outcome = service
            .generate_at(&report(), fixed_instant(), false)
            .expect("Should export");
        assert_eq!(outcome.delivery, DeliveryStatus::Skipped);
        assert!(mailer.sent.lock().expect("Lock should not be poisoned").is_empty());
    }
}
