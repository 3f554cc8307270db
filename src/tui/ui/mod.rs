//! UI module: View components for the TUI.

pub mod chart;
pub mod progress;
pub mod results;
pub mod upload;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::Notice;
use crate::tui::styles::{MedicalTheme, LOGO_SMALL};

pub const DISCLAIMER: &str = "This prediction is generated by an automated ML model and is not a \
substitute for professional medical diagnosis. Always consult a licensed healthcare provider \
before taking any medical action.";

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![Line::from(vec![
        Span::styled("DISCLAIMER: ", MedicalTheme::warning()),
        Span::styled(DISCLAIMER, MedicalTheme::text_muted()),
    ])];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

/// Screen header: product name, title and a secondary caption.
pub fn render_header(f: &mut Frame, area: Rect, title: &str, caption: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {LOGO_SMALL} │ "), MedicalTheme::subtitle()),
        Span::styled(title.to_string(), MedicalTheme::title()),
        Span::styled(format!(" │ {caption}"), MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

/// One-line status message, or nothing.
pub fn notice_line(notice: Option<&Notice>) -> Line<'static> {
    match notice {
        Some(Notice::Success(message)) => Line::from(vec![
            Span::styled("✓ ", MedicalTheme::success()),
            Span::styled(message.clone(), MedicalTheme::success()),
        ]),
        Some(Notice::Warning(message)) => Line::from(vec![
            Span::styled("! ", MedicalTheme::warning()),
            Span::styled(message.clone(), MedicalTheme::warning()),
        ]),
        Some(Notice::Error(message)) => Line::from(vec![
            Span::styled("✗ ", MedicalTheme::danger()),
            Span::styled(message.clone(), MedicalTheme::danger()),
        ]),
        None => Line::from(""),
    }
}

/// Footer with `[key] description` pairs.
pub fn render_key_hints(f: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(format!("[{key}] "), MedicalTheme::key_hint()),
                Span::styled(format!("{desc}  "), MedicalTheme::key_desc()),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}
