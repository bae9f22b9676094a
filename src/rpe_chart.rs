//! RPE reference chart: (RPE, reps) -> fraction of one-rep max.
//!
//! The chart is a table with one row per RPE and one column per repetition
//! count. It can be read from a CSV file or from the first sheet of an Excel
//! workbook; both use the same layout:
//!
//! ```text
//! RPE,1,2,3,...,12
//! 10,1.0,0.955,0.922,...
//! 9.5,0.978,0.939,0.907,...
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use log::debug;

use crate::domain::Rpe;
use crate::error::{EstimateError, ParseError};

/// Highest repetition count covered by the chart.
pub const MAX_TABULATED_REPS: u32 = 12;

/// Immutable lookup table mapping (RPE, reps) to a fraction of one-rep max.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpeChart {
    entries: BTreeMap<(Rpe, u32), f64>,
}

impl RpeChart {
    /// Builds a chart from explicit entries.
    ///
    /// # Errors
    /// Returns ParseError if a fraction is outside (0, 1] or a key repeats.
    #[allow(dead_code)] // Charts built in code; the binary only loads files
    pub fn from_entries<I>(entries: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (Rpe, u32, f64)>,
    {
        let mut builder = ChartBuilder::default();
        for (idx, (rpe, reps, fraction)) in entries.into_iter().enumerate() {
            builder.insert(rpe, reps, fraction, idx + 1, 0)?;
        }
        Ok(builder.finish())
    }

    /// Reads a chart in CSV layout from any reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = headers
            .iter()
            .enumerate()
            .skip(1)
            .map(|(column, value)| parse_rep_header(value, column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = ChartBuilder::default();
        for (row_idx, record) in rdr.records().enumerate() {
            let record = record?;
            let row_num = row_idx + 2; // +1 for 0-index, +1 for header row

            let rpe_cell = record.get(0).unwrap_or_default();
            let rpe = parse_rpe(rpe_cell, row_num)?;

            for (column, (cell, reps)) in record.iter().skip(1).zip(&columns).enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let fraction = cell
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidFraction {
                        row: row_num,
                        column: column + 1,
                        value: cell.to_string(),
                    })?;
                builder.insert(rpe, *reps, fraction, row_num, column + 1)?;
            }
        }

        Ok(builder.finish())
    }

    /// Returns the fraction of one-rep max for an exact (reps, RPE) key.
    ///
    /// # Errors
    /// Returns `EstimateError::MissingReferenceEntry` if the key is not
    /// tabulated. Callers clamp reps and RPE before looking up.
    pub fn lookup(&self, reps: u32, rpe: Rpe) -> Result<f64, EstimateError> {
        self.entries
            .get(&(rpe, reps))
            .copied()
            .ok_or(EstimateError::MissingReferenceEntry {
                rpe: rpe.value(),
                reps,
            })
    }

    /// Returns the number of tabulated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the chart has no entries, as when a file holds only
    /// a header row.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all tabulated ratings in ascending order.
    pub fn ratings(&self) -> Vec<Rpe> {
        let ratings: BTreeSet<Rpe> = self.entries.keys().map(|(rpe, _)| *rpe).collect();
        ratings.into_iter().collect()
    }

    /// Returns all tabulated rep counts in ascending order.
    pub fn rep_counts(&self) -> Vec<u32> {
        let reps: BTreeSet<u32> = self.entries.keys().map(|(_, reps)| *reps).collect();
        reps.into_iter().collect()
    }

    /// Returns true if the lowest tabulated rating is present and every
    /// tabulated rating has an entry for each rep count from 1 to 12.
    ///
    /// When this holds, estimation can only fail for ratings that are not
    /// themselves rows of the chart (e.g. 8.3).
    pub fn covers_clamped_domain(&self) -> bool {
        let ratings = self.ratings();
        ratings.contains(&Rpe::MIN_TABULATED)
            && ratings.iter().all(|rpe| {
                (1..=MAX_TABULATED_REPS).all(|reps| self.entries.contains_key(&(*rpe, reps)))
            })
    }
}

/// Accumulates chart entries, rejecting invalid or duplicate cells.
#[derive(Default)]
struct ChartBuilder {
    entries: BTreeMap<(Rpe, u32), f64>,
}

impl ChartBuilder {
    fn insert(
        &mut self,
        rpe: Rpe,
        reps: u32,
        fraction: f64,
        row: usize,
        column: usize,
    ) -> Result<(), ParseError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ParseError::InvalidFraction {
                row,
                column,
                value: fraction.to_string(),
            });
        }
        if self.entries.insert((rpe, reps), fraction).is_some() {
            return Err(ParseError::DuplicateEntry { rpe, reps });
        }
        Ok(())
    }

    fn finish(self) -> RpeChart {
        RpeChart {
            entries: self.entries,
        }
    }
}

/// Loads an RPE chart, choosing the reader by file extension.
///
/// # Arguments
/// * `path` - Path to a `.csv` file or an Excel workbook (`.xlsx`)
///
/// # Errors
/// Returns ParseError if the file is missing, has an unknown extension, or
/// does not follow the chart layout.
pub fn load_rpe_chart<P: AsRef<Path>>(path: P) -> Result<RpeChart, ParseError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ParseError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let chart = match extension.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .map_err(|e| ParseError::CannotRead(format!("{}: {}", path.display(), e)))?;
            RpeChart::from_csv_reader(file)?
        }
        "xlsx" => load_xlsx(path)?,
        _ => return Err(ParseError::UnsupportedFormat(path.display().to_string())),
    };

    debug!(
        "Loaded RPE chart from {}: {} entries, {} ratings",
        path.display(),
        chart.len(),
        chart.ratings().len()
    );

    Ok(chart)
}

fn load_xlsx(path: &Path) -> Result<RpeChart, ParseError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ParseError::CannotRead(format!("{}: {}", path.display(), e)))?;

    // Get the first worksheet
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| ParseError::InvalidFormat("workbook has no sheets".to_string()))?;

    let range = workbook.worksheet_range(sheet_name).map_err(|e| {
        ParseError::CannotRead(format!("cannot read sheet '{}': {}", sheet_name, e))
    })?;

    let mut rows = range.rows();

    let header = rows
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("empty worksheet".to_string()))?;

    // The used range can extend past the last labelled column
    let columns = header
        .iter()
        .enumerate()
        .skip(1)
        .take_while(|(_, cell)| **cell != Data::Empty)
        .map(|(column, cell)| parse_rep_header(&cell_text(cell), column))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = ChartBuilder::default();
    for (row_idx, row) in rows.enumerate() {
        let row_num = row_idx + 2;

        // Skip empty rows silently (common at end of spreadsheets)
        if row.first().is_none_or(|cell| *cell == Data::Empty) {
            continue;
        }

        let rpe = rpe_from_cell(&row[0], row_num)?;

        for (column, (cell, reps)) in row.iter().skip(1).zip(&columns).enumerate() {
            if let Some(fraction) = fraction_from_cell(cell, row_num, column + 1)? {
                builder.insert(rpe, *reps, fraction, row_num, column + 1)?;
            }
        }
    }

    Ok(builder.finish())
}

/// Reads the RPE index cell of a worksheet row.
fn rpe_from_cell(cell: &Data, row: usize) -> Result<Rpe, ParseError> {
    match cell {
        Data::Float(f) => rpe_from_number(*f, row),
        Data::Int(i) => rpe_from_number(*i as f64, row),
        other => parse_rpe(&cell_text(other), row),
    }
}

/// Reads a fraction cell of a worksheet row. Blank cells are untabulated.
fn fraction_from_cell(cell: &Data, row: usize, column: usize) -> Result<Option<f64>, ParseError> {
    let fraction = match cell {
        Data::Empty => return Ok(None),
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidFraction {
                row,
                column,
                value: s.clone(),
            })?,
        other => {
            return Err(ParseError::InvalidFraction {
                row,
                column,
                value: format!("{:?}", other),
            });
        }
    };
    Ok(Some(fraction))
}

/// Renders a header or index cell as text for numeric parsing.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Empty => String::new(),
        other => format!("{:?}", other),
    }
}

/// Parses a repetition column header. "12", "12.0" and "12 " are all 12.
fn parse_rep_header(value: &str, column: usize) -> Result<u32, ParseError> {
    let invalid = || ParseError::InvalidRepHeader {
        column,
        value: value.to_string(),
    };

    let reps = value.trim().parse::<f64>().map_err(|_| invalid())?;
    if reps < 1.0 || reps.fract() != 0.0 || reps > f64::from(u32::MAX) {
        return Err(invalid());
    }
    Ok(reps as u32)
}

fn parse_rpe(value: &str, row: usize) -> Result<Rpe, ParseError> {
    let rpe = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidRpe {
            row,
            value: value.to_string(),
        })?;
    rpe_from_number(rpe, row)
}

/// Converts a numeric RPE index to a key. Ratings must be positive and lie
/// on the tenths grid.
fn rpe_from_number(value: f64, row: usize) -> Result<Rpe, ParseError> {
    let invalid = || ParseError::InvalidRpe {
        row,
        value: value.to_string(),
    };

    if value <= 0.0 {
        return Err(invalid());
    }
    Rpe::from_f64(value).ok_or_else(invalid)
}
