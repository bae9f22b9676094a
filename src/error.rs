//! Error types for the pl-toolbox application.

use thiserror::Error;

use crate::domain::Rpe;

/// Errors that can occur when loading the workout database or the RPE chart.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("cannot read file: {0}")]
    CannotRead(String),

    #[error("unsupported chart format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("invalid chart format: {0}")]
    InvalidFormat(String),

    #[error("invalid repetition header in column {column}: {value}")]
    InvalidRepHeader { column: usize, value: String },

    #[error("invalid RPE value in row {row}: {value}")]
    InvalidRpe { row: usize, value: String },

    #[error("invalid fraction in row {row}, column {column}: {value}")]
    InvalidFraction {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("duplicate chart entry for RPE {rpe} at {reps} reps")]
    DuplicateEntry { rpe: Rpe, reps: u32 },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors raised while estimating one-rep maxes.
#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    /// The clamped (RPE, reps) key is not tabulated. This means the chart is
    /// incomplete, so the whole batch is aborted.
    #[error("RPE chart has no entry for RPE {rpe} at {reps} reps")]
    MissingReferenceEntry { rpe: f64, reps: u32 },
}
