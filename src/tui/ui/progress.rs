//! Prediction-in-flight view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::tui::styles::MedicalTheme;

/// Progress the bar never passes while the request is still open.
pub const PROGRESS_CEILING: f64 = 0.95;

const PROGRESS_TAU_SECS: f64 = 4.0;

/// Prediction screen state
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    pub records: usize,
    pub progress: f64,
}

impl ProgressState {
    /// Advance the bar for `elapsed_secs` since the request started. Never
    /// moves backwards.
    pub fn tick(&mut self, elapsed_secs: f64) {
        self.progress = self.progress.max(eased_progress(elapsed_secs));
    }
}

/// Smooth, monotonic fake progress approaching [`PROGRESS_CEILING`].
///
/// The service gives no progress signal, so the bar only shows that the
/// request is alive.
#[must_use]
pub fn eased_progress(elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    let k = 1.0 - (-elapsed_secs / PROGRESS_TAU_SECS).exp();
    (PROGRESS_CEILING * k).clamp(0.0, PROGRESS_CEILING)
}

/// Render the prediction progress screen
pub fn render_progress(f: &mut Frame, area: Rect, state: &ProgressState, endpoint: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .margin(2)
        .split(inner);

    let stage = Paragraph::new(Line::from(vec![
        Span::styled("Predicting sepsis risk for ", MedicalTheme::text_secondary()),
        Span::styled(format!("{} records", state.records), MedicalTheme::focused()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(stage, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::info())
        .ratio(state.progress.clamp(0.0, 1.0))
        .label(format!("{:.0}%", state.progress * 100.0));
    f.render_widget(gauge, chunks[1]);

    let desc = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Waiting for {endpoint}"),
            MedicalTheme::text_muted(),
        )),
        Line::from(Span::styled(
            "The service may take a while to wake up.",
            MedicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(desc, chunks[2]);
}
