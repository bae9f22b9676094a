//! Analysis orchestration for the workout log.
//!
//! Turns the raw set log into one estimated 1RM per (date, exercise) by
//! estimating every set, keeping the heaviest set(s) of each session and
//! taking their best estimate.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use log::debug;
use rayon::prelude::*;

use crate::domain::{EstimatedMax, ExerciseSet};
use crate::error::EstimateError;
use crate::formulas::estimate_1rm;
use crate::rpe_chart::RpeChart;

/// Anything carrying a recorded bar weight, for heaviest-set selection.
pub(crate) trait Weighted {
    /// Bar weight in kilograms.
    fn weight_kg(&self) -> f64;
}

impl Weighted for ExerciseSet {
    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}

/// A set together with its estimated 1RM.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EstimatedSet<'a> {
    pub set: &'a ExerciseSet,
    pub estimated_1rm: f64,
}

impl Weighted for EstimatedSet<'_> {
    fn weight_kg(&self) -> f64 {
        self.set.weight_kg
    }
}

/// Returns every set whose weight equals the group's maximum weight.
///
/// Ties are all kept. Empty input gives empty output.
pub(crate) fn select_highest_weight<T: Weighted>(sets: &[T]) -> Vec<&T> {
    let max_weight = sets
        .iter()
        .map(Weighted::weight_kg)
        .fold(f64::NEG_INFINITY, f64::max);

    sets.iter().filter(|s| s.weight_kg() == max_weight).collect()
}

/// Builds the estimated 1RM series for every (date, exercise) in the log.
///
/// Zero-rep sets are dropped before grouping. Within each group every set is
/// estimated, the heaviest set(s) are kept and the highest of their
/// estimates is emitted. Groups are processed in parallel; output is sorted
/// by exercise, then date.
///
/// # Errors
/// Returns `MissingReferenceEntry` if any set maps to a key the chart lacks.
/// A single failure aborts the whole batch.
pub fn build_e1rm_series(
    log: &[ExerciseSet],
    chart: &RpeChart,
) -> Result<Vec<EstimatedMax>, EstimateError> {
    let mut groups: BTreeMap<(&str, NaiveDateTime), Vec<&ExerciseSet>> = BTreeMap::new();
    for set in log.iter().filter(|s| s.reps >= 1) {
        groups
            .entry((set.exercise.as_str(), set.date))
            .or_default()
            .push(set);
    }

    debug!(
        "Estimating 1RM for {} sets in {} groups",
        groups.values().map(Vec::len).sum::<usize>(),
        groups.len()
    );

    let groups: Vec<_> = groups.into_iter().collect();
    let series = groups
        .into_par_iter()
        .map(|((exercise, date), sets)| {
            let estimated = estimate_group(&sets, chart)?;
            let best = select_highest_weight(&estimated)
                .into_iter()
                .map(|s| s.estimated_1rm)
                .reduce(f64::max);

            Ok(best.map(|estimated_max| EstimatedMax {
                exercise: exercise.to_string(),
                date,
                estimated_max,
            }))
        })
        .collect::<Result<Vec<_>, EstimateError>>()?;

    Ok(series.into_iter().flatten().collect())
}

/// Estimates every set of one group; all sets have reps >= 1.
fn estimate_group<'a>(
    sets: &[&'a ExerciseSet],
    chart: &RpeChart,
) -> Result<Vec<EstimatedSet<'a>>, EstimateError> {
    let mut estimated = Vec::with_capacity(sets.len());
    for &set in sets {
        if let Some(estimated_1rm) = estimate_1rm(set.weight_kg, set.reps, set.rpe, chart)? {
            estimated.push(EstimatedSet { set, estimated_1rm });
        }
    }
    Ok(estimated)
}

/// Keeps only the records for one exercise (case-insensitive).
pub fn filter_exercise(series: Vec<EstimatedMax>, exercise: &str) -> Vec<EstimatedMax> {
    let exercise = exercise.trim();
    series
        .into_iter()
        .filter(|record| record.exercise.eq_ignore_ascii_case(exercise))
        .collect()
}

/// Per-exercise overview of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSummary {
    pub exercise: String,
    pub set_count: usize,
    pub session_count: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

/// Summarizes the log per exercise, sorted by exercise name.
pub fn summarize_exercises(log: &[ExerciseSet]) -> Vec<ExerciseSummary> {
    let mut by_exercise: BTreeMap<&str, Vec<NaiveDateTime>> = BTreeMap::new();
    for set in log {
        by_exercise.entry(set.exercise.as_str()).or_default().push(set.date);
    }

    by_exercise
        .into_iter()
        .filter_map(|(exercise, mut dates)| {
            let set_count = dates.len();
            dates.sort();
            let first = *dates.first()?;
            let last = *dates.last()?;
            dates.dedup();
            Some(ExerciseSummary {
                exercise: exercise.to_string(),
                set_count,
                session_count: dates.len(),
                first,
                last,
            })
        })
        .collect()
}
