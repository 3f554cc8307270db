//! Results view: risk table, distribution donut and export status.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::adapters::csv_report::{
    format_value, PATIENT_ID_COLUMN, PREDICTION_COLUMN, WARNING_COLUMN,
};
use crate::application::{DeliveryStatus, ExportOutcome, Notice};
use crate::domain::{PredictionReport, ResultRow};
use crate::tui::styles::MedicalTheme;

use super::chart::render_donut;

const PATIENT_ID_WIDTH: u16 = 12;
const PREDICTION_WIDTH: u16 = 17;
const WARNING_WIDTH: u16 = 20;
const MIN_FEATURE_WIDTH: u16 = 7;
const PAGE_ROWS: usize = 10;

/// Results screen state
#[derive(Debug, Clone, Default)]
pub struct ResultsState {
    /// Header title, fixed when the prediction came back
    pub title: String,
    pub selected_row: usize,
    /// First feature column shown
    pub col_offset: usize,
}

impl ResultsState {
    #[must_use]
    pub fn new(title: String) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    pub fn next_row(&mut self, rows: usize) {
        if rows > 0 {
            self.selected_row = (self.selected_row + 1).min(rows - 1);
        }
    }

    pub fn prev_row(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn page_down(&mut self, rows: usize) {
        if rows > 0 {
            self.selected_row = (self.selected_row + PAGE_ROWS).min(rows - 1);
        }
    }

    pub fn page_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(PAGE_ROWS);
    }

    pub fn next_col(&mut self, columns: usize) {
        if self.col_offset + 1 < columns {
            self.col_offset += 1;
        }
    }

    pub fn prev_col(&mut self) {
        self.col_offset = self.col_offset.saturating_sub(1);
    }
}

/// Width of a feature column.
#[must_use]
pub fn feature_width(name: &str) -> u16 {
    u16::try_from(name.len())
        .unwrap_or(u16::MAX)
        .max(MIN_FEATURE_WIDTH)
        + 1
}

/// How many feature columns from `offset` fit in `width` cells next to the
/// fixed ID, prediction and warning columns. Always at least one when any
/// remain, so narrow terminals can still scroll through them.
#[must_use]
pub fn visible_feature_count(columns: &[&str], offset: usize, width: u16) -> usize {
    let fixed = PATIENT_ID_WIDTH + PREDICTION_WIDTH + WARNING_WIDTH;
    let mut remaining = width.saturating_sub(fixed);
    let mut count = 0;

    for name in columns.iter().skip(offset) {
        let w = feature_width(name);
        if w > remaining {
            break;
        }
        remaining -= w;
        count += 1;
    }

    if count == 0 && offset < columns.len() {
        1
    } else {
        count
    }
}

/// Cell text for a feature, formatted as in the CSV export.
fn display_value(row: &ResultRow, column: &str) -> String {
    row.record.get(column).map(format_value).unwrap_or_default()
}

/// Render the results screen
pub fn render_results(
    f: &mut Frame,
    area: Rect,
    state: &ResultsState,
    report: &PredictionReport,
    export: Option<&ExportOutcome>,
    email_enabled: bool,
    notice: Option<&Notice>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Min(8),    // Table + chart
            Constraint::Length(4), // Export status
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        format!(" {}", state.title),
        MedicalTheme::subtitle(),
    )));
    f.render_widget(title, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(rows[1]);

    render_table(f, body[0], state, report);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(7)])
        .split(body[1]);

    let summary = report.summary();
    render_donut(f, side[0], &summary);

    let summary_lines = vec![
        Line::from(vec![
            Span::styled("Positive: ", MedicalTheme::text_secondary()),
            Span::styled(summary.positive.to_string(), MedicalTheme::danger()),
        ]),
        Line::from(vec![
            Span::styled("Negative: ", MedicalTheme::text_secondary()),
            Span::styled(summary.negative.to_string(), MedicalTheme::success()),
        ]),
        Line::from(vec![
            Span::styled("Total:    ", MedicalTheme::text_secondary()),
            Span::styled(summary.total.to_string(), MedicalTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("Positive share: ", MedicalTheme::text_secondary()),
            Span::styled(format!("{:.1}%", summary.positive_percent), MedicalTheme::title()),
        ]),
    ];
    let summary_panel = Paragraph::new(summary_lines).block(
        Block::default()
            .title(Span::styled(" Summary ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(summary_panel, side[1]);

    render_export_status(f, rows[2], export, email_enabled, notice);
}

fn render_table(f: &mut Frame, area: Rect, state: &ResultsState, report: &PredictionReport) {
    let columns = report.feature_columns();
    let inner_width = area.width.saturating_sub(2);
    let shown = visible_feature_count(&columns, state.col_offset, inner_width);
    let visible: Vec<&str> = columns
        .iter()
        .skip(state.col_offset)
        .take(shown)
        .copied()
        .collect();

    let header = Row::new(
        std::iter::once(PATIENT_ID_COLUMN)
            .chain(visible.iter().copied())
            .chain([PREDICTION_COLUMN, WARNING_COLUMN])
            .map(|name| Cell::from(name.to_string())),
    )
    .style(MedicalTheme::table_header());

    let body: Vec<Row> = report
        .rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(visible.len() + 3);
            cells.push(Cell::from(row.patient_id.clone()));
            cells.extend(visible.iter().map(|name| Cell::from(display_value(row, name))));
            cells.push(Cell::from(row.prediction.as_str()));
            cells.push(Cell::from(
                row.warning.as_ref().map(|w| w.message()).unwrap_or_default(),
            ));
            Row::new(cells).style(MedicalTheme::label(row.prediction))
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(PATIENT_ID_WIDTH))
        .chain(visible.iter().map(|name| Constraint::Length(feature_width(name))))
        .chain([
            Constraint::Length(PREDICTION_WIDTH),
            Constraint::Length(WARNING_WIDTH),
        ])
        .collect();

    let scroll_hint = if columns.is_empty() {
        String::new()
    } else {
        format!(
            " columns {}-{} of {} ",
            state.col_offset + 1,
            state.col_offset + visible.len(),
            columns.len()
        )
    };

    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .title(Span::styled(" Sepsis Risk ", MedicalTheme::subtitle()))
                .title_bottom(Span::styled(scroll_hint, MedicalTheme::text_muted()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border_focused()),
        )
        .row_highlight_style(MedicalTheme::selected());

    let mut table_state = TableState::default().with_selected(Some(state.selected_row));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn render_export_status(
    f: &mut Frame,
    area: Rect,
    export: Option<&ExportOutcome>,
    email_enabled: bool,
    notice: Option<&Notice>,
) {
    let mut lines = Vec::new();

    match export {
        Some(export) => {
            lines.push(Line::from(vec![
                Span::styled("Report: ", MedicalTheme::text_secondary()),
                Span::styled(export.path.display().to_string(), MedicalTheme::text()),
            ]));
            lines.push(match &export.delivery {
                DeliveryStatus::Sent { recipients } => Line::from(Span::styled(
                    format!("E-mail sent to {}", recipients.join(", ")),
                    MedicalTheme::success(),
                )),
                DeliveryStatus::Skipped => Line::from(Span::styled(
                    "E-mail not sent (delivery not configured)",
                    MedicalTheme::text_muted(),
                )),
                DeliveryStatus::Failed { error } => Line::from(Span::styled(
                    error.clone(),
                    MedicalTheme::danger(),
                )),
            });
        }
        None => {
            let delivery = if email_enabled {
                "Press G to save the CSV report and e-mail it."
            } else {
                "Press G to save the CSV report (e-mail delivery not configured)."
            };
            lines.push(Line::from(Span::styled(delivery, MedicalTheme::text_muted())));
        }
    }

    if notice.is_some() {
        lines.push(super::notice_line(notice));
    }

    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(MedicalTheme::border()),
        );
    f.render_widget(status, area);
}
