//! Donut chart of the label distribution.
//!
//! Slices start at twelve o'clock and run clockwise, Negative first. The
//! hole covers the inner 60% of the radius and shows the positive share.

use std::f64::consts::TAU;

use ratatui::{
    layout::Rect,
    style::Modifier,
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Points},
        Block, Borders,
    },
    Frame,
};

use crate::domain::{PredictionSummary, SepsisLabel};
use crate::tui::styles::MedicalTheme;

pub const CHART_TITLE: &str = "Sepsis Prediction Distribution";

/// Inner radius as a fraction of the outer radius.
pub const HOLE_RATIO: f64 = 0.6;

/// Sampled points of each slice, in the unit square centred on the origin.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DonutPoints {
    pub negative: Vec<(f64, f64)>,
    pub positive: Vec<(f64, f64)>,
}

/// Label owning the point at clockwise angle `turn` (0.0..1.0 of a full turn).
#[must_use]
pub fn slice_at(summary: &PredictionSummary, turn: f64) -> Option<SepsisLabel> {
    if summary.total == 0 {
        return None;
    }
    if turn < summary.negative_fraction() {
        Some(SepsisLabel::Negative)
    } else {
        Some(SepsisLabel::Positive)
    }
}

/// Sample the ring on a polar grid of `rings` radii by `steps` angles.
#[must_use]
pub fn donut_points(summary: &PredictionSummary, rings: usize, steps: usize) -> DonutPoints {
    let mut points = DonutPoints::default();
    if summary.total == 0 || rings == 0 || steps == 0 {
        return points;
    }

    for ring in 0..rings {
        let radius = if rings == 1 {
            1.0
        } else {
            HOLE_RATIO + (1.0 - HOLE_RATIO) * ring as f64 / (rings - 1) as f64
        };
        for step in 0..steps {
            let turn = step as f64 / steps as f64;
            let angle = turn * TAU;
            // Clockwise from twelve o'clock.
            let xy = (radius * angle.sin(), radius * angle.cos());
            match slice_at(summary, turn) {
                Some(SepsisLabel::Negative) => points.negative.push(xy),
                Some(SepsisLabel::Positive) => points.positive.push(xy),
                None => {}
            }
        }
    }

    points
}

/// Render the donut with the positive percentage in the hole.
pub fn render_donut(f: &mut Frame, area: Rect, summary: &PredictionSummary) {
    let points = donut_points(summary, 24, 360);
    let centre = format!("{:.1}%", summary.positive_percent);

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(Span::styled(format!(" {CHART_TITLE} "), MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .marker(Marker::Braille)
        .x_bounds([-1.1, 1.1])
        .y_bounds([-1.1, 1.1])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &points.negative,
                color: MedicalTheme::label_color(SepsisLabel::Negative),
            });
            ctx.draw(&Points {
                coords: &points.positive,
                color: MedicalTheme::label_color(SepsisLabel::Positive),
            });
            ctx.layer();
            ctx.print(
                -0.02 * centre.len() as f64,
                0.1,
                Line::from(Span::styled(
                    centre.clone(),
                    MedicalTheme::title().add_modifier(Modifier::BOLD),
                )),
            );
            ctx.print(
                -0.16,
                -0.15,
                Line::from(Span::styled("Positive", MedicalTheme::text_secondary())),
            );
        });

    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(positive: usize, negative: usize) -> PredictionSummary {
        let labels = std::iter::repeat(SepsisLabel::Positive)
            .take(positive)
            .chain(std::iter::repeat(SepsisLabel::Negative).take(negative));
        PredictionSummary::from_labels(labels)
    }

    #[test]
    fn test_negative_slice_comes_first() {
        let s = summary(1, 3);
        assert_eq!(slice_at(&s, 0.0), Some(SepsisLabel::Negative));
        assert_eq!(slice_at(&s, 0.74), Some(SepsisLabel::Negative));
        assert_eq!(slice_at(&s, 0.75), Some(SepsisLabel::Positive));
        assert_eq!(slice_at(&s, 0.99), Some(SepsisLabel::Positive));
    }

    #[test]
    fn test_points_split_by_share() {
        let s = summary(3, 7);
        let points = donut_points(&s, 4, 100);

        assert_eq!(points.negative.len(), 4 * 70);
        assert_eq!(points.positive.len(), 4 * 30);
    }

    #[test]
    fn test_points_stay_in_ring() {
        let points = donut_points(&summary(5, 5), 6, 90);
        for (x, y) in points.negative.iter().chain(&points.positive) {
            let r = (x * x + y * y).sqrt();
            assert!(r >= HOLE_RATIO - 1e-9 && r <= 1.0 + 1e-9, "radius {r}");
        }
    }

    #[test]
    fn test_single_label_fills_ring() {
        let points = donut_points(&summary(0, 4), 2, 36);
        assert!(points.positive.is_empty());
        assert_eq!(points.negative.len(), 72);

        let points = donut_points(&summary(4, 0), 2, 36);
        assert!(points.negative.is_empty());
    }

    #[test]
    fn test_empty_summary_draws_nothing() {
        assert_eq!(donut_points(&summary(0, 0), 8, 360), DonutPoints::default());
    }
}
