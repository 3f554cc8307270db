//! Prediction result types.
//!
//! Represents the output of the remote sepsis model, joined back to the
//! lab records it was computed from.

use serde::{Deserialize, Serialize};

use super::lab::{present_features, LabRecord};

/// Binary sepsis risk label returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SepsisLabel {
    Positive,
    Negative,
}

impl SepsisLabel {
    /// Decode a wire label (0 or 1, integer or integral float).
    #[must_use]
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        match value.as_f64()? {
            v if v == 1.0 => Some(Self::Positive),
            v if v == 0.0 => Some(Self::Negative),
            _ => None,
        }
    }

    /// Label as shown in the table and the CSV report.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive)
    }
}

impl std::fmt::Display for SepsisLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SepsisLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positive" => Ok(Self::Positive),
            "Negative" => Ok(Self::Negative),
            other => Err(format!("unknown prediction label {other:?}")),
        }
    }
}

/// Temperatures strictly below this (°C) raise [`Warning::LowTemperature`].
pub const LOW_TEMPERATURE_THRESHOLD: f64 = 35.0;

/// Derived clinical warning attached to a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    LowTemperature,
}

impl Warning {
    /// Warning derived from a record, if any.
    #[must_use]
    pub fn for_record(record: &LabRecord) -> Option<Self> {
        record
            .temperature()
            .filter(|&t| t < LOW_TEMPERATURE_THRESHOLD)
            .map(|_| Self::LowTemperature)
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::LowTemperature => "Temperature is low",
        }
    }

    /// Parse a warning cell; an empty cell means no warning.
    ///
    /// # Errors
    /// Returns the cell text when it is not a known warning.
    pub fn from_cell(cell: &str) -> Result<Option<Self>, String> {
        match cell {
            "" => Ok(None),
            "Temperature is low" => Ok(Some(Self::LowTemperature)),
            other => Err(format!("unknown warning {other:?}")),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// One patient's sanitized inputs with the predicted label.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Synthetic identifier (`Patient_<n>`, 1-based)
    pub patient_id: String,

    pub record: LabRecord,

    pub prediction: SepsisLabel,

    pub warning: Option<Warning>,
}

impl ResultRow {
    /// Build the row for the record at 0-based `index`.
    #[must_use]
    pub fn new(index: usize, record: LabRecord, prediction: SepsisLabel) -> Self {
        Self {
            patient_id: patient_id(index),
            warning: Warning::for_record(&record),
            record,
            prediction,
        }
    }
}

/// Synthetic patient identifier for the record at 0-based `index`.
#[must_use]
pub fn patient_id(index: usize) -> String {
    format!("Patient_{}", index + 1)
}

/// Aggregate label counts for the distribution chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSummary {
    pub positive: usize,
    pub negative: usize,
    pub total: usize,
    /// Share of positive predictions in percent, rounded to one decimal.
    pub positive_percent: f64,
}

impl PredictionSummary {
    #[must_use]
    pub fn from_labels<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = SepsisLabel>,
    {
        let (positive, negative) = labels
            .into_iter()
            .fold((0, 0), |(p, n), label| match label {
                SepsisLabel::Positive => (p + 1, n),
                SepsisLabel::Negative => (p, n + 1),
            });
        let total = positive + negative;
        let positive_percent = if total == 0 {
            0.0
        } else {
            round_one_decimal(positive as f64 * 100.0 / total as f64)
        };

        Self {
            positive,
            negative,
            total,
            positive_percent,
        }
    }

    /// Fraction of the chart covered by the negative slice (0.0..=1.0).
    #[must_use]
    pub fn negative_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.negative as f64 / self.total as f64
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ordered prediction results for one batch.
#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub rows: Vec<ResultRow>,

    /// When the prediction came back
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionReport {
    /// Join records with their labels.
    ///
    /// # Errors
    /// Returns `(records, labels)` lengths when they differ; no partial
    /// report is ever built.
    pub fn from_predictions(
        records: Vec<LabRecord>,
        labels: Vec<SepsisLabel>,
    ) -> Result<Self, (usize, usize)> {
        if records.len() != labels.len() {
            return Err((records.len(), labels.len()));
        }

        let rows = records
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (record, label))| ResultRow::new(i, record, label))
            .collect();

        Ok(Self::from_rows(rows))
    }

    #[must_use]
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self {
            rows,
            generated_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> PredictionSummary {
        PredictionSummary::from_labels(self.rows.iter().map(|r| r.prediction))
    }

    /// Feature columns present in at least one row, in allow-list order.
    #[must_use]
    pub fn feature_columns(&self) -> Vec<&'static str> {
        present_features(self.rows.iter().map(|r| &r.record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
