//! Upload view: path entry for a lab records file.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::{LabBatch, Notice, PAYLOAD_KEY};
use crate::domain::FEATURE_COUNT;
use crate::tui::styles::MedicalTheme;

/// Bundled demo batch, loadable without a file on disk.
pub const SAMPLE_BATCH: &str = include_str!("../../../demos/sample_batch.json");
pub const SAMPLE_SOURCE: &str = "sample_batch.json";

/// Upload screen state
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    /// Path typed by the user
    pub path: String,
}

impl UploadState {
    pub fn input_char(&mut self, c: char) {
        if !c.is_control() {
            self.path.push(c);
        }
    }

    pub fn delete_char(&mut self) {
        self.path.pop();
    }

    pub fn clear(&mut self) {
        self.path.clear();
    }

    /// Typed path with surrounding whitespace and quotes removed, as pasted
    /// from a file manager.
    #[must_use]
    pub fn trimmed_path(&self) -> &str {
        self.path.trim().trim_matches(|c| c == '"' || c == '\'')
    }
}

/// Render the upload screen
pub fn render_upload(
    f: &mut Frame,
    area: Rect,
    state: &UploadState,
    batch: Option<&LabBatch>,
    notice: Option<&Notice>,
    endpoint: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Instructions
            Constraint::Length(3), // Path input
            Constraint::Length(4), // Loaded batch
            Constraint::Length(2), // Notice
            Constraint::Min(0),
        ])
        .margin(1)
        .split(area);

    let instructions = Paragraph::new(vec![
        Line::from(Span::styled(
            "Upload Hospital Lab Records (JSON)",
            MedicalTheme::subtitle(),
        )),
        Line::from(vec![
            Span::styled("The file must contain a top-level ", MedicalTheme::text_secondary()),
            Span::styled(format!("'{PAYLOAD_KEY}'"), MedicalTheme::focused()),
            Span::styled(
                format!(" array of patient records. Only the {FEATURE_COUNT} model inputs are sent;"),
                MedicalTheme::text_secondary(),
            ),
        ]),
        Line::from(Span::styled(
            "other fields and empty values are dropped before prediction.",
            MedicalTheme::text_secondary(),
        )),
        Line::from(vec![
            Span::styled("Model service: ", MedicalTheme::text_muted()),
            Span::styled(endpoint.to_string(), MedicalTheme::text_muted()),
        ]),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[0]);

    let input = Paragraph::new(Line::from(vec![
        Span::styled(state.path.clone(), MedicalTheme::text()),
        Span::styled("█", MedicalTheme::focused()),
    ]))
    .block(
        Block::default()
            .title(Span::styled(" File path ", MedicalTheme::text_secondary()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border_focused()),
    );
    f.render_widget(input, chunks[1]);

    let loaded = match batch {
        Some(batch) => vec![
            Line::from(vec![
                Span::styled("Loaded: ", MedicalTheme::text_secondary()),
                Span::styled(batch.source.clone(), MedicalTheme::text()),
            ]),
            Line::from(vec![
                Span::styled("Records: ", MedicalTheme::text_secondary()),
                Span::styled(batch.len().to_string(), MedicalTheme::text()),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "No lab records loaded.",
            MedicalTheme::text_muted(),
        ))],
    };
    let loaded = Paragraph::new(loaded).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(loaded, chunks[2]);

    let notice = Paragraph::new(super::notice_line(notice)).wrap(Wrap { trim: true });
    f.render_widget(notice, chunks[3]);
}
