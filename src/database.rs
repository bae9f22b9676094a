//! Workout-tracker database access.
//!
//! The tracker stores sets, exercise names, exercise days and training days
//! in separate tables, with times as milliseconds since the Unix epoch.

use std::path::Path;

use log::{info, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::domain::{BodyweightEntry, ExerciseSet, timestamp_to_local};
use crate::error::ParseError;

/// Join producing one row per performed set.
const PROGRAM_LOG_QUERY: &str = "\
SELECT S.Comment AS Set_Comment, \
       CAST(S.Weight AS REAL) AS Weight, \
       CAST(S.Rep AS INTEGER) AS Rep, \
       CAST(S.RPE AS REAL) AS RPE, \
       EN.Name AS Exercise, \
       ED.Comment AS Exercise_Comment, \
       CAST(D.Time AS INTEGER) AS Date \
FROM [Set] AS S \
INNER JOIN ExerciseName AS EN ON S.fkExerciseNameID = EN.id \
INNER JOIN ExerciseDay AS ED ON S.fkExerciseDayID = ED.id \
INNER JOIN Day AS D ON ED.fkDayID = D.id";

const BODYWEIGHT_QUERY: &str = "\
SELECT CAST(Time AS INTEGER) AS Time, CAST(Weight AS REAL) AS Weight \
FROM Bodyweight \
ORDER BY Time, id";

/// Opens the tracker database read-only.
///
/// # Errors
/// Returns ParseError if the file does not exist or SQLite cannot open it.
pub async fn open<P: AsRef<Path>>(path: P) -> Result<SqlitePool, ParseError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ParseError::FileNotFound(path.display().to_string()));
    }

    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Loads every performed set, sorted by date and then exercise.
///
/// A NULL RPE means the rating was not recorded and becomes 0. Rows with an
/// unusable timestamp or a negative rep count are skipped with a warning.
pub async fn load_program_log(pool: &SqlitePool) -> Result<Vec<ExerciseSet>, ParseError> {
    let rows = sqlx::query(PROGRAM_LOG_QUERY).fetch_all(pool).await?;

    let mut log = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        if let Some(set) = parse_set_row(row, idx + 1)? {
            log.push(set);
        }
    }

    log.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.exercise.cmp(&b.exercise)));

    info!("Loaded {} sets from program log", log.len());
    Ok(log)
}

fn parse_set_row(row: &SqliteRow, row_num: usize) -> Result<Option<ExerciseSet>, ParseError> {
    let millis: Option<i64> = row.try_get("Date")?;
    let Some(date) = millis.and_then(timestamp_to_local) else {
        warn!("invalid date in set row {}: {:?}", row_num, millis);
        return Ok(None);
    };

    let reps: i64 = row.try_get::<Option<i64>, _>("Rep")?.unwrap_or(0);
    let Ok(reps) = u32::try_from(reps) else {
        warn!("invalid repetitions value in set row {}: {}", row_num, reps);
        return Ok(None);
    };

    let exercise: String = row.try_get("Exercise")?;
    let weight_kg = row.try_get::<Option<f64>, _>("Weight")?.unwrap_or(0.0);
    let rpe = row.try_get::<Option<f64>, _>("RPE")?.unwrap_or(0.0);

    let mut set = ExerciseSet::new(date, exercise, reps, weight_kg, rpe);
    set.set_comment = row.try_get("Set_Comment")?;
    set.exercise_comment = row.try_get("Exercise_Comment")?;
    Ok(Some(set))
}

/// Loads bodyweight measurements in date order, rounded to 0.1 kg.
pub async fn load_bodyweight(pool: &SqlitePool) -> Result<Vec<BodyweightEntry>, ParseError> {
    let rows = sqlx::query(BODYWEIGHT_QUERY).fetch_all(pool).await?;

    let mut entries = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let millis: Option<i64> = row.try_get("Time")?;
        let weight: Option<f64> = row.try_get("Weight")?;

        match (millis.and_then(timestamp_to_local), weight) {
            (Some(date), Some(weight)) => entries.push(BodyweightEntry {
                date,
                weight_kg: round_to_tenth(weight),
            }),
            _ => warn!(
                "skipping bodyweight row {}: time {:?}, weight {:?}",
                idx + 1,
                millis,
                weight
            ),
        }
    }

    info!("Loaded {} bodyweight entries", entries.len());
    Ok(entries)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        // A single connection, since every :memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in [
            "CREATE TABLE ExerciseName (id INTEGER PRIMARY KEY, Name TEXT NOT NULL)",
            "CREATE TABLE Day (id INTEGER PRIMARY KEY, Time INTEGER NOT NULL)",
            "CREATE TABLE ExerciseDay (id INTEGER PRIMARY KEY, fkDayID INTEGER, Comment TEXT)",
            "CREATE TABLE [Set] (id INTEGER PRIMARY KEY, fkExerciseNameID INTEGER, \
             fkExerciseDayID INTEGER, Weight REAL, Rep INTEGER, RPE REAL, Comment TEXT)",
            "CREATE TABLE Bodyweight (id INTEGER PRIMARY KEY, Time INTEGER, Weight REAL)",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        pool
    }

    const DAY_ONE: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z
    const DAY_TWO: i64 = 1_704_153_600_000; // 2024-01-02T00:00:00Z

    async fn seed_program(pool: &SqlitePool) {
        for statement in [
            "INSERT INTO ExerciseName VALUES (1, 'Squat'), (2, 'Bench')",
            "INSERT INTO Day VALUES (1, 1704153600000), (2, 1704067200000)",
            "INSERT INTO ExerciseDay VALUES (1, 1, 'felt good'), (2, 2, NULL), (3, 2, NULL)",
            "INSERT INTO [Set] VALUES \
             (1, 1, 1, 100, 5, 8.0, 'belt'), \
             (2, 2, 2, 70.0, 3, NULL, NULL), \
             (3, 1, 3, 120.0, 1, 9.5, NULL), \
             (4, 1, 3, 140.0, 0, 10, 'missed')",
        ] {
            sqlx::query(statement).execute(pool).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_load_program_log() {
        let pool = memory_pool().await;
        seed_program(&pool).await;

        let log = load_program_log(&pool).await.unwrap();
        assert_eq!(log.len(), 4);

        // Sorted by date, then exercise name
        let day_one = timestamp_to_local(DAY_ONE).unwrap();
        let day_two = timestamp_to_local(DAY_TWO).unwrap();
        assert_eq!(log[0].date, day_one);
        assert_eq!(log[0].exercise, "Bench");
        assert_eq!(log[1].exercise, "Squat");
        assert_eq!(log[3].date, day_two);

        assert_eq!(log[3].weight_kg, 100.0);
        assert_eq!(log[3].rpe, 8.0);
        assert_eq!(log[3].set_comment.as_deref(), Some("belt"));
        assert_eq!(log[3].exercise_comment.as_deref(), Some("felt good"));

        // NULL RPE means unrecorded
        assert_eq!(log[0].rpe, 0.0);
        assert!(log[0].set_comment.is_none());

        // Zero-rep sets are kept in the log
        assert!(log.iter().any(|s| s.reps == 0 && s.weight_kg == 140.0));
    }

    #[tokio::test]
    async fn test_load_program_log_skips_negative_reps() {
        let pool = memory_pool().await;
        seed_program(&pool).await;
        sqlx::query("INSERT INTO [Set] VALUES (5, 2, 2, 60.0, -1, 7.0, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let log = load_program_log(&pool).await.unwrap();
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn test_load_bodyweight() {
        let pool = memory_pool().await;
        sqlx::query(
            "INSERT INTO Bodyweight VALUES \
             (1, 1704153600000, 82.34), \
             (2, 1704067200000, 82.96), \
             (3, NULL, 80.0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let entries = load_bodyweight(&pool).await.unwrap();
        assert_eq!(
            entries,
            vec![
                BodyweightEntry {
                    date: timestamp_to_local(DAY_ONE).unwrap(),
                    weight_kg: 83.0,
                },
                BodyweightEntry {
                    date: timestamp_to_local(DAY_TWO).unwrap(),
                    weight_kg: 82.3,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = open("/nonexistent/tracker.db").await.unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound(_)));
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(82.34), 82.3);
        assert_eq!(round_to_tenth(82.96), 83.0);
        assert_eq!(round_to_tenth(80.0), 80.0);
    }
}
