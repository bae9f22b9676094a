//! CSV and JSON export of computed series.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{BodyweightEntry, EstimatedMax};

/// Output format for exported series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// Pretty-printed JSON array.
    Json,
}

/// Errors that can occur while writing output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the estimated 1RM series (`exercise,date,estimated_max`).
pub fn write_series<W: Write>(
    records: &[EstimatedMax],
    format: OutputFormat,
    writer: W,
) -> Result<(), ExportError> {
    write_records(records, format, writer)
}

/// Writes the bodyweight series (`date,weight_kg`).
pub fn write_bodyweight<W: Write>(
    entries: &[BodyweightEntry],
    format: OutputFormat,
    writer: W,
) -> Result<(), ExportError> {
    write_records(entries, format, writer)
}

fn write_records<T: Serialize, W: Write>(
    records: &[T],
    format: OutputFormat,
    mut writer: W,
) -> Result<(), ExportError> {
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(writer);
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_series() -> Vec<EstimatedMax> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        vec![
            EstimatedMax {
                exercise: "Bench".to_string(),
                date,
                estimated_max: 82.5,
            },
            EstimatedMax {
                exercise: "Squat".to_string(),
                date,
                estimated_max: 125.0,
            },
        ]
    }

    #[test]
    fn test_write_series_csv() {
        let mut out = Vec::new();
        write_series(&sample_series(), OutputFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "exercise,date,estimated_max\n\
             Bench,2024-01-01 09:00:00,82.5\n\
             Squat,2024-01-01 09:00:00,125.0\n"
        );
    }

    #[test]
    fn test_write_series_json() {
        let mut out = Vec::new();
        write_series(&sample_series(), OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[1]["exercise"], "Squat");
        assert_eq!(value[1]["date"], "2024-01-01 09:00:00");
        assert_eq!(value[1]["estimated_max"], 125.0);
    }

    #[test]
    fn test_write_empty_series_json() {
        let mut out = Vec::new();
        write_series(&[], OutputFormat::Json, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn test_write_bodyweight_csv() {
        let entries = vec![BodyweightEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(7, 15, 0)
                .unwrap(),
            weight_kg: 82.3,
        }];
        let mut out = Vec::new();
        write_bodyweight(&entries, OutputFormat::Csv, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,weight_kg\n2024-03-05 07:15:00,82.3\n"
        );
    }
}
