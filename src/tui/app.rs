//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Service integration
//! - Background prediction via worker thread

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::adapters::{HttpPredictionClient, SmtpMailer};
use crate::application::{
    load_payload, load_payload_file, report_title, PredictionService, ReportService, Session,
};
use crate::config::AppConfig;
use crate::ports::{PredictionApi, ReportMailer};

use super::ui::{
    progress::{render_progress, ProgressState},
    render_disclaimer, render_header, render_key_hints,
    results::{render_results, ResultsState},
    upload::{render_upload, UploadState, SAMPLE_BATCH, SAMPLE_SOURCE},
};
use super::worker::{PredictionProgress, PredictionWorker, PredictionWorkerHandle};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Upload,
    Predicting,
    Results,
}

/// Main application state
pub struct App<P = HttpPredictionClient, M = SmtpMailer>
where
    P: PredictionApi + 'static,
    M: ReportMailer,
{
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    /// Loaded batch, results and status message
    session: Session,

    /// Prediction service (shared with the worker thread)
    prediction_service: Arc<PredictionService<P>>,

    /// Report export and delivery
    report_service: ReportService<M>,

    upload_state: UploadState,
    results_state: ResultsState,
    progress_state: ProgressState,

    /// Pending prediction worker (if running)
    pending_worker: Option<PredictionWorkerHandle>,

    /// When the pending request started (for the progress animation)
    request_started_at: Option<Instant>,
}

impl App {
    /// Create a new application instance from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client or the mail transport cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api = Arc::new(HttpPredictionClient::new(
            config.api_url.clone(),
            config.api_timeout,
        )?);

        let mailer = match &config.mail {
            Some(mail) => Some(Arc::new(SmtpMailer::from_config(mail)?)),
            None => None,
        };

        Ok(Self::with_dependencies(
            PredictionService::new(api),
            ReportService::new(mailer, config.report_dir.clone(), config.timezone),
        ))
    }
}

impl<P, M> App<P, M>
where
    P: PredictionApi + 'static,
    M: ReportMailer,
{
    /// Create application with injected services (Composition Root pattern).
    pub fn with_dependencies(
        prediction_service: PredictionService<P>,
        report_service: ReportService<M>,
    ) -> Self {
        Self {
            screen: Screen::Upload,
            should_quit: false,
            session: Session::new(),
            prediction_service: Arc::new(prediction_service),
            report_service,
            upload_state: UploadState::default(),
            results_state: ResultsState::default(),
            progress_state: ProgressState::default(),
            pending_worker: None,
            request_started_at: None,
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Main loop
        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            // Poll pending worker for progress updates
            self.poll_worker();

            // Animate request progress (fake loading bar)
            self.tick_progress();

            terminal.draw(|f| self.draw(f))?;

            // Handle input (short poll to stay responsive)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Draw the current screen with its header, footer and disclaimer.
    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(2), // Key hints
                Constraint::Length(3), // Disclaimer
            ])
            .split(f.area());

        let (title, caption) = match self.screen {
            Screen::Upload => ("Upload Lab Records", "Sepsis risk prediction"),
            Screen::Predicting => ("Predicting", "Remote model"),
            Screen::Results => ("Prediction Results", "Sepsis risk by patient"),
        };
        render_header(f, chunks[0], title, caption);

        match self.screen {
            Screen::Upload => render_upload(
                f,
                chunks[1],
                &self.upload_state,
                self.session.batch(),
                self.session.notice(),
                self.prediction_service.endpoint(),
            ),
            Screen::Predicting => render_progress(
                f,
                chunks[1],
                &self.progress_state,
                self.prediction_service.endpoint(),
            ),
            Screen::Results => {
                if let Some(report) = self.session.report() {
                    render_results(
                        f,
                        chunks[1],
                        &self.results_state,
                        report,
                        self.session.export(),
                        self.report_service.email_enabled(),
                        self.session.notice(),
                    );
                }
            }
        }

        render_key_hints(f, chunks[2], &self.key_hints());
        render_disclaimer(f, chunks[3]);
    }

    fn key_hints(&self) -> Vec<(&'static str, &'static str)> {
        match self.screen {
            Screen::Upload => {
                let mut hints = vec![
                    ("Enter", "Load file"),
                    ("F2", "Load sample"),
                    ("F5", "Proceed"),
                ];
                if self.session.report().is_some() {
                    hints.push(("Tab", "Results"));
                }
                hints.push(("Ctrl+Q", "Quit"));
                hints
            }
            Screen::Predicting => vec![("Ctrl+Q", "Quit")],
            Screen::Results => vec![
                ("↑↓", "Rows"),
                ("←→", "Columns"),
                ("G", "Generate report"),
                ("P", "Predict again"),
                ("N", "New upload"),
                ("Esc", "Back"),
                ("Q", "Quit"),
            ],
        }
    }

    /// Poll the background worker for progress updates.
    pub fn poll_worker(&mut self) {
        // We must not hold a borrow of `pending_worker` while mutating `self`.
        loop {
            let progress = match self
                .pending_worker
                .as_ref()
                .and_then(|worker| worker.try_recv())
            {
                Some(p) => p,
                None => break,
            };

            match progress {
                PredictionProgress::Sending { records } => {
                    self.progress_state.records = records;
                }
                PredictionProgress::Complete(report) => {
                    self.results_state = ResultsState::new(report_title(
                        &report
                            .generated_at
                            .with_timezone(&self.report_service.timezone()),
                    ));
                    self.session.finish_prediction(Ok(report));
                    self.finish_worker(Screen::Results);
                    break;
                }
                PredictionProgress::Failed(e) => {
                    self.session.finish_prediction(Err(e));
                    self.finish_worker(Screen::Upload);
                    break;
                }
            }
        }
    }

    fn finish_worker(&mut self, screen: Screen) {
        self.pending_worker = None;
        self.request_started_at = None;
        self.screen = screen;
    }

    fn tick_progress(&mut self) {
        if self.pending_worker.is_none() {
            return;
        }
        if let Some(started_at) = self.request_started_at {
            let elapsed = Instant::now()
                .saturating_duration_since(started_at)
                .as_secs_f64();
            self.progress_state.tick(elapsed);
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Upload => self.handle_upload_key(key),
            // One action at a time: nothing else until the worker reports back.
            Screen::Predicting => {}
            Screen::Results => self.handle_results_key(key),
        }
    }

    fn handle_upload_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.load_typed_path(),
            KeyCode::F(2) => {
                self.session
                    .load(load_payload(SAMPLE_BATCH.as_bytes(), SAMPLE_SOURCE));
            }
            KeyCode::F(5) => self.start_prediction(),
            KeyCode::Tab => {
                if self.session.report().is_some() {
                    self.screen = Screen::Results;
                }
            }
            KeyCode::Char(c) => {
                self.upload_state.input_char(c);
            }
            KeyCode::Backspace => {
                self.upload_state.delete_char();
            }
            KeyCode::Delete => {
                self.upload_state.clear();
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        let rows = self.session.report().map_or(0, |r| r.len());
        let columns = self
            .session
            .report()
            .map_or(0, |r| r.feature_columns().len());

        match key {
            KeyCode::Down => self.results_state.next_row(rows),
            KeyCode::Up => self.results_state.prev_row(),
            KeyCode::PageDown => self.results_state.page_down(rows),
            KeyCode::PageUp => self.results_state.page_up(),
            KeyCode::Right => self.results_state.next_col(columns),
            KeyCode::Left => self.results_state.prev_col(),
            KeyCode::Char('g') | KeyCode::Char('G') => self.generate_report(),
            KeyCode::Char('p') | KeyCode::Char('P') => self.start_prediction(),
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.session.reset();
                self.upload_state.clear();
                self.screen = Screen::Upload;
            }
            KeyCode::Esc => {
                self.session.clear_notice();
                self.screen = Screen::Upload;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn load_typed_path(&mut self) {
        let path = self.upload_state.trimmed_path().to_string();
        if path.is_empty() {
            return;
        }
        self.session.load(load_payload_file(Path::new(&path)));
    }

    fn start_prediction(&mut self) {
        let Some(batch) = self.session.begin_prediction() else {
            self.screen = Screen::Upload;
            return;
        };

        self.screen = Screen::Predicting;
        self.progress_state = ProgressState {
            records: batch.len(),
            progress: 0.0,
        };
        self.request_started_at = Some(Instant::now());

        // Spawn background worker so the UI keeps drawing while we wait.
        let worker = PredictionWorker::spawn(self.prediction_service.clone(), batch);
        self.pending_worker = Some(worker);
    }

    fn generate_report(&mut self) {
        let Some(report) = self.session.begin_report() else {
            return;
        };
        let result = self
            .report_service
            .generate_at(&report, report.generated_at, true);
        self.session.finish_report(result);
    }
}
