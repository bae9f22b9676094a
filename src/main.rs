mod analysis;
mod database;
mod domain;
mod error;
mod export;
mod formulas;
mod rpe_chart;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::analysis::{build_e1rm_series, filter_exercise, summarize_exercises};
use crate::domain::DATE_FORMAT;
use crate::export::{OutputFormat, write_bodyweight, write_series};
use crate::rpe_chart::load_rpe_chart;

/// Powerlifting analytics over a workout-tracker database.
#[derive(Parser, Debug)]
#[command(name = "pl-toolbox")]
#[command(about = "Estimated 1RM and bodyweight series from a workout-tracker database")]
#[command(version)]
struct Args {
    /// Path to the SQLite database exported by the workout tracker.
    /// Can also be set via PLTOOLBOX_DB environment variable.
    #[arg(long, value_name = "FILE", env = "PLTOOLBOX_DB")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate one-rep maxes per exercise and training day.
    E1rm {
        /// RPE chart (.csv or .xlsx) with RPE rows and rep-count columns.
        /// Can also be set via PLTOOLBOX_CHART environment variable.
        #[arg(long, value_name = "FILE", env = "PLTOOLBOX_CHART")]
        chart: PathBuf,

        /// Only output this exercise (case-insensitive).
        #[arg(long)]
        exercise: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Export bodyweight measurements.
    Bodyweight {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print per-exercise set counts and date ranges.
    Summary,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Output file (defaults to stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn writer(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            None => Ok(Box::new(io::stdout().lock())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let pool = database::open(&args.db)
        .await
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;

    match &args.command {
        Command::E1rm {
            chart,
            exercise,
            output,
        } => run_e1rm(&pool, chart, exercise.as_deref(), output).await,
        Command::Bodyweight { output } => {
            let entries = database::load_bodyweight(&pool)
                .await
                .context("Failed to load bodyweight")?;
            write_bodyweight(&entries, output.format, output.writer()?)
                .context("Failed to write bodyweight")?;
            Ok(())
        }
        Command::Summary => run_summary(&pool).await,
    }
}

/// Loads the log and chart, builds the e1RM series and writes it out.
async fn run_e1rm(
    pool: &sqlx::SqlitePool,
    chart_path: &Path,
    exercise: Option<&str>,
    output: &OutputArgs,
) -> Result<()> {
    let chart = load_rpe_chart(chart_path)
        .with_context(|| format!("Failed to load RPE chart from {}", chart_path.display()))?;
    if chart.is_empty() {
        anyhow::bail!("RPE chart {} has no entries", chart_path.display());
    }
    if !chart.covers_clamped_domain() {
        log::warn!(
            "RPE chart {} does not cover RPE 5-10 x 1-12 reps (ratings {:?}, reps {:?})",
            chart_path.display(),
            chart.ratings().iter().map(ToString::to_string).collect::<Vec<_>>(),
            chart.rep_counts()
        );
    }

    let program_log = database::load_program_log(pool)
        .await
        .context("Failed to load program log")?;

    let mut series =
        build_e1rm_series(&program_log, &chart).context("Failed to estimate 1RM series")?;
    if let Some(exercise) = exercise {
        series = filter_exercise(series, exercise);
        if series.is_empty() {
            log::warn!("No estimates for exercise '{}'", exercise);
        }
    }

    log::info!("Estimated {} (date, exercise) maxes", series.len());
    write_series(&series, output.format, output.writer()?).context("Failed to write series")?;

    Ok(())
}

/// Prints an overview of the program log.
async fn run_summary(pool: &sqlx::SqlitePool) -> Result<()> {
    let program_log = database::load_program_log(pool)
        .await
        .context("Failed to load program log")?;

    println!("=== Program Log Summary ===");
    println!();
    println!("Total sets: {}", program_log.len());
    println!(
        "Sets without RPE: {}",
        program_log.iter().filter(|s| !s.has_rpe()).count()
    );

    let summaries = summarize_exercises(&program_log);
    if let (Some(first), Some(last)) = (
        summaries.iter().map(|s| s.first).min(),
        summaries.iter().map(|s| s.last).max(),
    ) {
        println!(
            "Date range: {} to {}",
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        );
    }

    println!();

    for summary in &summaries {
        println!(
            "{:20} {:5} sets {:4} sessions  ({} to {})",
            summary.exercise,
            summary.set_count,
            summary.session_count,
            summary.first.date(),
            summary.last.date()
        );
    }

    Ok(())
}
