//! Background prediction worker.
//!
//! The remote call blocks for as long as the service takes to answer, so it
//! runs on its own thread and reports back over a channel while the TUI keeps
//! redrawing.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::application::{LabBatch, PredictionService};
use crate::domain::PredictionReport;
use crate::ports::PredictionApi;
use crate::SepsiscopeError;

/// Progress updates from the prediction worker.
#[derive(Debug)]
pub enum PredictionProgress {
    /// Request is on the wire
    Sending { records: usize },
    /// Labels received and joined with the batch
    Complete(PredictionReport),
    /// Sanitization, transport or response failure
    Failed(SepsiscopeError),
}

/// Handle to a running prediction worker.
pub struct PredictionWorkerHandle {
    /// Receiver for progress updates
    pub progress_rx: Receiver<PredictionProgress>,
    /// Thread handle (for joining)
    _handle: JoinHandle<()>,
}

impl PredictionWorkerHandle {
    /// Try to receive the next progress update (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<PredictionProgress> {
        self.progress_rx.try_recv().ok()
    }
}

/// Prediction worker that runs the remote call in background.
pub struct PredictionWorker;

impl PredictionWorker {
    /// Spawn a background prediction task for `batch`.
    pub fn spawn<P>(service: Arc<PredictionService<P>>, batch: LabBatch) -> PredictionWorkerHandle
    where
        P: PredictionApi + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            Self::run_with_progress(&service, &batch, &tx);
        });

        PredictionWorkerHandle {
            progress_rx: rx,
            _handle: handle,
        }
    }

    fn run_with_progress<P>(
        service: &PredictionService<P>,
        batch: &LabBatch,
        tx: &Sender<PredictionProgress>,
    ) where
        P: PredictionApi,
    {
        // The receiver may be gone if the user quit mid-request.
        let _ = tx.send(PredictionProgress::Sending {
            records: batch.len(),
        });

        let progress = match service.run(batch) {
            Ok(report) => PredictionProgress::Complete(report),
            Err(e) => {
                tracing::error!("Prediction failed: {}", e);
                PredictionProgress::Failed(e)
            }
        };
        let _ = tx.send(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::load_payload;
    use crate::application::fakes::ScriptedApi;
    use crate::domain::SepsisLabel;
    use crate::ports::PredictionError;
    use std::time::Duration;

    fn drain(handle: &PredictionWorkerHandle) -> Vec<PredictionProgress> {
        let mut updates = Vec::new();
        while let Ok(update) = handle.progress_rx.recv_timeout(Duration::from_secs(5)) {
            let done = matches!(
                update,
                PredictionProgress::Complete(_) | PredictionProgress::Failed(_)
            );
            updates.push(update);
            if done {
                break;
            }
        }
        updates
    }

    fn batch() -> LabBatch {
        load_payload(br#"{"sepsis_fv": [{"Age": 80}, {"Age": 22}]}"#, "ward.json")
            .expect("Should load")
    }

    #[test]
    fn test_worker_reports_completion() {
        let api = Arc::new(ScriptedApi::answering(Ok(vec![
            SepsisLabel::Negative,
            SepsisLabel::Positive,
        ])));
        let service = Arc::new(PredictionService::new(api));

        let handle = PredictionWorker::spawn(service, batch());
        let updates = drain(&handle);

        assert!(matches!(updates[0], PredictionProgress::Sending { records: 2 }));
        match updates.last() {
            Some(PredictionProgress::Complete(report)) => {
                assert_eq!(report.len(), 2);
                assert_eq!(report.rows[1].prediction, SepsisLabel::Positive);
            }
            other => panic!("unexpected final update: {other:?}"),
        }
    }

    #[test]
    fn test_worker_reports_failure() {
        let api = Arc::new(ScriptedApi::answering(Err(PredictionError::Transport(
            "connection refused".to_string(),
        ))));
        let service = Arc::new(PredictionService::new(api));

        let handle = PredictionWorker::spawn(service, batch());
        let updates = drain(&handle);

        match updates.last() {
            Some(PredictionProgress::Failed(SepsiscopeError::Network(message))) => {
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected final update: {other:?}"),
        }
    }
}
