//! Strength calculation formulas: RPE-chart e1RM and plate rounding.

use crate::domain::Rpe;
use crate::error::EstimateError;
use crate::rpe_chart::{MAX_TABULATED_REPS, RpeChart};

/// Smallest common plate increment (kg) for rounding estimates.
pub const PLATE_INCREMENT_KG: f64 = 2.5;

/// Rounds a weight to the nearest multiple of the plate increment.
///
/// Ties go to the even multiple: 101.25 rounds to 100.0 and 103.75 rounds
/// to 105.0.
pub fn round_to_plates(weight_kg: f64) -> f64 {
    (weight_kg / PLATE_INCREMENT_KG).round_ties_even() * PLATE_INCREMENT_KG
}

/// Estimates 1RM for a single set using the RPE chart.
///
/// RPE below 5 is treated as 5 and reps above 12 are treated as 12, the
/// edges of the chart. An unrecorded RPE (0) therefore uses the RPE 5 row.
/// The chart is keyed by exact ratings, so a rating off the tenths grid
/// (9.46) has no entry.
///
/// # Arguments
/// * `weight_kg` - Weight lifted in kilograms
/// * `reps` - Number of repetitions performed
/// * `rpe` - Recorded RPE (0 when not recorded)
/// * `chart` - Reference chart of fraction of 1RM by (RPE, reps)
///
/// # Returns
/// `Ok(None)` for a zero-rep set, otherwise the estimate rounded to plates.
///
/// # Errors
/// Returns `MissingReferenceEntry` if the clamped key is not in the chart.
pub fn estimate_1rm(
    weight_kg: f64,
    reps: u32,
    rpe: f64,
    chart: &RpeChart,
) -> Result<Option<f64>, EstimateError> {
    if reps == 0 {
        return Ok(None);
    }

    let rpe = rpe.max(Rpe::MIN_TABULATED.value());
    let reps = reps.min(MAX_TABULATED_REPS);

    let key = Rpe::from_f64(rpe).ok_or(EstimateError::MissingReferenceEntry { rpe, reps })?;
    let fraction = chart.lookup(reps, key)?;
    Ok(Some(round_to_plates(weight_kg / fraction)))
}
