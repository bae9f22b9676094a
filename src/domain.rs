//! Domain types for workout log representation.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Serialize, Serializer};

/// Format used when dates leave the application (CSV/JSON export).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rating of perceived exertion, stored as fixed-point tenths.
///
/// Chart keys are compared on the integer representation, so 8.5 read from
/// a chart file and 8.5 read from the database are always the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rpe(u16);

impl Rpe {
    /// Lowest rating covered by the chart; lower ratings are clamped up to it.
    pub const MIN_TABULATED: Rpe = Rpe(50);

    /// Tolerance for float noise when snapping a rating onto the tenths grid.
    const GRID_EPSILON: f64 = 1e-6;

    /// Converts a float rating to a key, if it lies on the tenths grid.
    ///
    /// Values within float noise of a tenth (9.4999999999) snap to it. Off-grid
    /// values such as 9.46, negatives and non-finite values return None.
    pub fn from_f64(value: f64) -> Option<Self> {
        let scaled = value * 10.0;
        let tenths = scaled.round();
        if !tenths.is_finite() || tenths < 0.0 || tenths > f64::from(u16::MAX) {
            return None;
        }
        if (scaled - tenths).abs() >= Self::GRID_EPSILON {
            return None;
        }
        Some(Rpe(tenths as u16))
    }

    /// Returns the rating as a float.
    pub fn value(&self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Rpe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// One performed set from the workout log.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSet {
    pub date: NaiveDateTime,
    pub exercise: String,
    pub reps: u32,
    pub weight_kg: f64,
    /// Recorded RPE; 0.0 means the rating was not recorded.
    pub rpe: f64,
    pub set_comment: Option<String>,
    pub exercise_comment: Option<String>,
}

impl ExerciseSet {
    /// Creates a set without comments.
    pub fn new(
        date: NaiveDateTime,
        exercise: impl Into<String>,
        reps: u32,
        weight_kg: f64,
        rpe: f64,
    ) -> Self {
        Self {
            date,
            exercise: exercise.into(),
            reps,
            weight_kg,
            rpe,
            set_comment: None,
            exercise_comment: None,
        }
    }

    /// Returns true if an RPE was recorded for this set.
    pub fn has_rpe(&self) -> bool {
        self.rpe > 0.0
    }
}

/// Estimated one-rep max for a single (date, exercise) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedMax {
    pub exercise: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub date: NaiveDateTime,
    pub estimated_max: f64,
}

/// A bodyweight measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyweightEntry {
    #[serde(serialize_with = "serialize_datetime")]
    pub date: NaiveDateTime,
    pub weight_kg: f64,
}

fn serialize_datetime<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

/// Converts a stored timestamp (milliseconds since the Unix epoch) to local
/// wall-clock time.
///
/// Returns None if the timestamp is out of chrono's representable range.
pub fn timestamp_to_local(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&Local).naive_local())
}
