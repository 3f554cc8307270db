//! Interactive session state machine.
//!
//! `Idle → Loaded → Predicted → Reported`, reset by loading a new file.
//! Lives in memory only; nothing survives a restart.

use crate::application::{ExportOutcome, LabBatch};
use crate::domain::PredictionReport;
use crate::SepsiscopeError;

/// User-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

/// Current stage of the session.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Nothing loaded
    #[default]
    Idle,
    /// Payload validated, not yet predicted
    Loaded { batch: LabBatch },
    /// Result table populated
    Predicted {
        batch: LabBatch,
        report: PredictionReport,
    },
    /// CSV generated (and possibly e-mailed)
    Reported {
        batch: LabBatch,
        report: PredictionReport,
        export: ExportOutcome,
    },
}

/// One interactive session.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    notice: Option<Notice>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// The loaded batch, in any state past `Idle`.
    #[must_use]
    pub fn batch(&self) -> Option<&LabBatch> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Loaded { batch }
            | SessionState::Predicted { batch, .. }
            | SessionState::Reported { batch, .. } => Some(batch),
        }
    }

    /// The result table, once predicted.
    #[must_use]
    pub fn report(&self) -> Option<&PredictionReport> {
        match &self.state {
            SessionState::Predicted { report, .. } | SessionState::Reported { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    /// The last export, once reported.
    #[must_use]
    pub fn export(&self) -> Option<&ExportOutcome> {
        match &self.state {
            SessionState::Reported { export, .. } => Some(export),
            _ => None,
        }
    }

    /// Apply the result of loading a file. Always discards previous results.
    pub fn load(&mut self, result: Result<LabBatch, SepsiscopeError>) {
        match result {
            Ok(batch) => {
                self.notice = Some(Notice::Success(format!(
                    "Hospital Lab Records loaded successfully ({} records from {}).",
                    batch.len(),
                    batch.source
                )));
                self.state = SessionState::Loaded { batch };
            }
            Err(e) => {
                self.notice = Some(Notice::Error(e.to_string()));
                self.state = SessionState::Idle;
            }
        }
    }

    /// Start a prediction: returns the batch to send, or sets a warning.
    pub fn begin_prediction(&mut self) -> Option<LabBatch> {
        match self.batch() {
            Some(batch) => {
                let batch = batch.clone();
                self.notice = None;
                Some(batch)
            }
            None => {
                self.notice = Some(Notice::Warning(
                    "Please upload a valid lab records file.".to_string(),
                ));
                None
            }
        }
    }

    /// Apply the result of a prediction.
    ///
    /// On failure the payload stays loaded and no result table is shown.
    pub fn finish_prediction(&mut self, result: Result<PredictionReport, SepsiscopeError>) {
        let Some(batch) = self.batch().cloned() else {
            tracing::warn!("Prediction finished with no batch loaded; ignoring");
            return;
        };

        match result {
            Ok(report) => {
                self.notice = None;
                self.state = SessionState::Predicted { batch, report };
            }
            Err(e) => {
                self.notice = Some(Notice::Error(e.to_string()));
                self.state = SessionState::Loaded { batch };
            }
        }
    }

    /// The report to export, or a warning when nothing has been predicted.
    pub fn begin_report(&mut self) -> Option<PredictionReport> {
        match self.report() {
            Some(report) => Some(report.clone()),
            None => {
                self.notice = Some(Notice::Warning(
                    "Run prediction before generating the report.".to_string(),
                ));
                None
            }
        }
    }

    /// Apply the result of an export.
    pub fn finish_report(&mut self, result: Result<ExportOutcome, SepsiscopeError>) {
        let state = std::mem::take(&mut self.state);
        let (batch, report) = match state {
            SessionState::Predicted { batch, report } | SessionState::Reported { batch, report, .. } => {
                (batch, report)
            }
            other => {
                self.state = other;
                return;
            }
        };

        match result {
            Ok(export) => {
                self.notice = Some(Notice::Success(format!(
                    "Report saved to {}",
                    export.path.display()
                )));
                self.state = SessionState::Reported {
                    batch,
                    report,
                    export,
                };
            }
            Err(e) => {
                self.notice = Some(Notice::Error(format!("Failed to generate report: {e}")));
                self.state = SessionState::Predicted { batch, report };
            }
        }
    }

    /// Back to `Idle`, dropping the batch and any results (new upload).
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.notice = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{load_payload, DeliveryStatus};
    use crate::domain::{LabRecord, SepsisLabel};

    fn batch() -> LabBatch {
        load_payload(br#"{"sepsis_fv": [{"Age": 50}]}"#, "ward.json").expect("Should load")
    }

    fn report() -> PredictionReport {
        let mut record = LabRecord::new();
        record.set("Age", 50.0);
        PredictionReport::from_predictions(vec![record], vec![SepsisLabel::Negative])
            .expect("Should build report")
    }

    fn export() -> ExportOutcome {
        ExportOutcome {
            title: "Prediction Results".to_string(),
            file_name: "Prediction Results.csv".to_string(),
            path: "reports/Prediction Results.csv".into(),
            csv: String::new(),
            delivery: DeliveryStatus::Skipped,
        }
    }

    #[test]
    fn test_failed_load_leaves_no_payload() {
        let mut session = Session::new();
        session.load(load_payload(br#"{"records": []}"#, "bad.json"));

        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.batch().is_none());
        assert!(session.report().is_none());
        assert!(matches!(session.notice(), Some(Notice::Error(_))));
    }

    #[test]
    fn test_proceed_requires_payload() {
        let mut session = Session::new();
        assert!(session.begin_prediction().is_none());
        assert_eq!(
            session.notice(),
            Some(&Notice::Warning("Please upload a valid lab records file.".to_string()))
        );
    }

    #[test]
    fn test_report_requires_prediction() {
        let mut session = Session::new();
        session.load(Ok(batch()));
        assert!(session.begin_report().is_none());
        assert!(matches!(session.notice(), Some(Notice::Warning(_))));
    }

    #[test]
    fn test_full_cycle() {
        let mut session = Session::new();
        session.load(Ok(batch()));
        assert!(matches!(session.state(), SessionState::Loaded { .. }));

        let sent = session.begin_prediction().expect("Should have batch");
        assert_eq!(sent.len(), 1);
        session.finish_prediction(Ok(report()));
        assert!(matches!(session.state(), SessionState::Predicted { .. }));

        let to_export = session.begin_report().expect("Should have report");
        assert_eq!(to_export.len(), 1);
        session.finish_report(Ok(export()));
        assert!(matches!(session.state(), SessionState::Reported { .. }));
        assert!(session.export().is_some());

        // A new upload resets results.
        session.load(Ok(batch()));
        assert!(matches!(session.state(), SessionState::Loaded { .. }));
        assert!(session.report().is_none());

        session.reset();
        assert!(matches!(session.state(), SessionState::Idle));
    }

    #[test]
    fn test_failed_prediction_keeps_payload() {
        let mut session = Session::new();
        session.load(Ok(batch()));
        session.begin_prediction();
        session.finish_prediction(Err(SepsiscopeError::ResponseShape(
            "Mismatch: Model returned 0 predictions for 1 inputs.".to_string(),
        )));

        assert!(matches!(session.state(), SessionState::Loaded { .. }));
        assert!(session.report().is_none());
        match session.notice() {
            Some(Notice::Error(message)) => assert!(message.contains("Mismatch")),
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn test_failed_export_keeps_results() {
        let mut session = Session::new();
        session.load(Ok(batch()));
        session.finish_prediction(Ok(report()));
        session.finish_report(Err(SepsiscopeError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ))));

        assert!(matches!(session.state(), SessionState::Predicted { .. }));
        assert!(matches!(session.notice(), Some(Notice::Error(_))));
    }
}
