//! CSV report codec.
//!
//! Columns: `PatientID`, the feature columns present in the report (model
//! order), `SepsisPrediction`, `Warning`. Absent values are empty cells.

use crate::domain::{feature_index, LabRecord, PredictionReport, ResultRow, SepsisLabel, Warning};
use crate::SepsiscopeError;

pub const PATIENT_ID_COLUMN: &str = "PatientID";
pub const PREDICTION_COLUMN: &str = "SepsisPrediction";
pub const WARNING_COLUMN: &str = "Warning";

/// Format a lab value the way it appears in the table and the CSV.
///
/// Integral values keep a trailing `.0` so the column reads as numeric.
#[must_use]
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Serialize a report to CSV text with a header row.
///
/// # Errors
/// Returns an error if the CSV writer fails.
pub fn to_csv(report: &PredictionReport) -> Result<String, SepsiscopeError> {
    let features = report.feature_columns();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = Vec::with_capacity(features.len() + 3);
    header.push(PATIENT_ID_COLUMN);
    header.extend(features.iter().copied());
    header.push(PREDICTION_COLUMN);
    header.push(WARNING_COLUMN);
    writer.write_record(&header)?;

    for row in &report.rows {
        let mut cells = Vec::with_capacity(header.len());
        cells.push(row.patient_id.clone());
        cells.extend(
            features
                .iter()
                .map(|f| row.record.get(f).map(format_value).unwrap_or_default()),
        );
        cells.push(row.prediction.to_string());
        cells.push(row.warning.map(|w| w.to_string()).unwrap_or_default());
        writer.write_record(&cells)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SepsiscopeError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| SepsiscopeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Parse CSV text produced by [`to_csv`] back into result rows.
///
/// # Errors
/// Returns `SepsiscopeError::InputValidation` if the header or a cell does
/// not match the report layout.
pub fn parse_csv(text: &str) -> Result<Vec<ResultRow>, SepsiscopeError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let columns: Vec<&str> = headers.iter().collect();
    let n = columns.len();
    if n < 3
        || columns[0] != PATIENT_ID_COLUMN
        || columns[n - 2] != PREDICTION_COLUMN
        || columns[n - 1] != WARNING_COLUMN
    {
        return Err(SepsiscopeError::InputValidation(format!(
            "not a prediction report header: {}",
            columns.join(",")
        )));
    }

    let features = &columns[1..n - 2];
    if let Some(unknown) = features.iter().find(|f| feature_index(f).is_none()) {
        return Err(SepsiscopeError::InputValidation(format!(
            "unknown report column {unknown:?}"
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let invalid = |msg: String| SepsiscopeError::InputValidation(format!("row {}: {msg}", line + 1));

        let mut lab = LabRecord::new();
        for (i, feature) in features.iter().enumerate() {
            let cell = record.get(i + 1).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell
                .parse()
                .map_err(|_| invalid(format!("{feature} is not a number: {cell:?}")))?;
            if !lab.set(feature, value) {
                return Err(invalid(format!("{feature} is not finite")));
            }
        }

        let prediction: SepsisLabel = record
            .get(n - 2)
            .unwrap_or("")
            .parse()
            .map_err(invalid)?;
        let warning = Warning::from_cell(record.get(n - 1).unwrap_or("")).map_err(invalid)?;

        rows.push(ResultRow {
            patient_id: record.get(0).unwrap_or("").to_string(),
            record: lab,
            prediction,
            warning,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PredictionReport {
        let mut cold = LabRecord::new();
        cold.set("Age", 71.0);
        cold.set("Temp", 34.5);
        cold.set("Lactate", 4.25);

        let mut warm = LabRecord::new();
        warm.set("Age", 38.0);
        warm.set("Temp", 36.0);

        PredictionReport::from_predictions(
            vec![cold, warm],
            vec![SepsisLabel::Positive, SepsisLabel::Negative],
        )
        .expect("Should build report")
    }

    #[test]
    fn test_csv_layout() {
        let csv = to_csv(&sample_report()).expect("Should export");
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("PatientID,Age,Temp,Lactate,SepsisPrediction,Warning")
        );
        assert_eq!(
            lines.next(),
            Some("Patient_1,71.0,34.5,4.25,Positive,Temperature is low")
        );
        assert_eq!(lines.next(), Some("Patient_2,38.0,36.0,,Negative,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_round_trip() {
        let report = sample_report();
        let csv = to_csv(&report).expect("Should export");
        let rows = parse_csv(&csv).expect("Should parse");

        assert_eq!(rows, report.rows);
        let labels: Vec<SepsisLabel> = rows.iter().map(|r| r.prediction).collect();
        assert_eq!(labels, vec![SepsisLabel::Positive, SepsisLabel::Negative]);
    }

    #[test]
    fn test_parse_rejects_foreign_csv() {
        assert!(matches!(
            parse_csv("name,score\nx,1\n"),
            Err(SepsiscopeError::InputValidation(_))
        ));
        assert!(matches!(
            parse_csv("PatientID,Bed,SepsisPrediction,Warning\nPatient_1,4,Negative,\n"),
            Err(SepsiscopeError::InputValidation(_))
        ));
        assert!(matches!(
            parse_csv("PatientID,Temp,SepsisPrediction,Warning\nPatient_1,36.0,Maybe,\n"),
            Err(SepsiscopeError::InputValidation(_))
        ));
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let report = PredictionReport::from_rows(Vec::new());
        let csv = to_csv(&report).expect("Should export");
        assert_eq!(csv, "PatientID,SepsisPrediction,Warning\n");
        assert!(parse_csv(&csv).expect("Should parse").is_empty());
    }
}
