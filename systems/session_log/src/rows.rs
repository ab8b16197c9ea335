use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use sorting_board_core::{BallColor, Outcome, TrialRecord};

use crate::ExportError;

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

fn seconds(duration: Duration) -> f64 {
    round_to(duration.as_secs_f64(), 3)
}

/// One exported trial, with values rounded to their persisted precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRow {
    /// Session the trial belongs to.
    pub session_id: String,
    /// Trial number within the session.
    pub trial_id: u64,
    /// Seconds of game time at spawn.
    pub spawn_time: f64,
    /// Seconds of game time at pickup.
    pub grasp_time: Option<f64>,
    /// Seconds of game time at release.
    pub release_time: Option<f64>,
    /// Seconds from spawn to release.
    pub completion_time: Option<f64>,
    /// Color of the ball.
    pub ball_color: BallColor,
    /// Ball diameter in board units.
    pub ball_size: f64,
    /// Color of the receiving hole on success.
    pub target_color: Option<BallColor>,
    /// Diameter of the receiving hole on success.
    pub target_size: Option<f64>,
    /// Planar distance to the nearest compatible hole.
    pub placement_error_px: f64,
    /// Outcome of the trial.
    pub outcome: Option<Outcome>,
}

impl From<&TrialRecord> for TrialRow {
    fn from(record: &TrialRecord) -> Self {
        Self {
            session_id: record.session().as_str().to_owned(),
            trial_id: record.trial().get(),
            spawn_time: seconds(record.spawn_time()),
            grasp_time: record.grasp_time().map(seconds),
            release_time: record.release_time().map(seconds),
            completion_time: record.completion_time().map(seconds),
            ball_color: record.ball_color(),
            ball_size: round_to(f64::from(record.ball_size()), 1),
            target_color: record.target_color(),
            target_size: record
                .target_size()
                .map(|size| round_to(f64::from(size), 1)),
            placement_error_px: round_to(f64::from(record.placement_error()), 2),
            outcome: record.outcome(),
        }
    }
}

/// CSV layout of a [`TrialRow`] with fixed decimal places.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    session_id: String,
    trial_id: u64,
    spawn_time: String,
    grasp_time: Option<String>,
    release_time: Option<String>,
    completion_time: Option<String>,
    ball_color: BallColor,
    ball_size: String,
    target_color: Option<BallColor>,
    target_size: Option<String>,
    placement_error_px: String,
    outcome: Option<Outcome>,
}

impl From<&TrialRow> for CsvRow {
    fn from(row: &TrialRow) -> Self {
        let time = |value: f64| format!("{value:.3}");
        let size = |value: f64| format!("{value:.1}");
        Self {
            session_id: row.session_id.clone(),
            trial_id: row.trial_id,
            spawn_time: time(row.spawn_time),
            grasp_time: row.grasp_time.map(time),
            release_time: row.release_time.map(time),
            completion_time: row.completion_time.map(time),
            ball_color: row.ball_color,
            ball_size: size(row.ball_size),
            target_color: row.target_color,
            target_size: row.target_size.map(size),
            placement_error_px: format!("{:.2}", row.placement_error_px),
            outcome: row.outcome,
        }
    }
}

impl CsvRow {
    fn into_row(self, path: &Path) -> Result<TrialRow, ExportError> {
        let trial = self.trial_id;
        let number = |field: &'static str, text: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|_| ExportError::Malformed {
                    path: path.to_path_buf(),
                    trial,
                    field,
                })
        };
        let optional = |field: &'static str, text: Option<String>| {
            text.filter(|value| !value.trim().is_empty())
                .map(|value| number(field, &value))
                .transpose()
        };
        Ok(TrialRow {
            spawn_time: number("spawn_time", &self.spawn_time)?,
            grasp_time: optional("grasp_time", self.grasp_time)?,
            release_time: optional("release_time", self.release_time)?,
            completion_time: optional("completion_time", self.completion_time)?,
            ball_size: number("ball_size", &self.ball_size)?,
            target_size: optional("target_size", self.target_size)?,
            placement_error_px: number("placement_error_px", &self.placement_error_px)?,
            session_id: self.session_id,
            trial_id: trial,
            ball_color: self.ball_color,
            target_color: self.target_color,
            outcome: self.outcome,
        })
    }
}

/// JSON envelope written for each session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Session identifier.
    pub session_id: String,
    /// Local wall-clock time of the export.
    pub export_time: String,
    /// Number of trials in the document.
    pub total_trials: usize,
    /// Trials in arrival order.
    pub trials: Vec<TrialRow>,
}

pub(crate) fn write_csv(path: &Path, rows: &[TrialRow]) -> Result<(), ExportError> {
    let csv_error = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for row in rows {
        writer.serialize(CsvRow::from(row)).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json(path: &Path, document: &SessionDocument) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)
}

/// Parses a session CSV file back into rows.
pub fn read_csv(path: &Path) -> Result<Vec<TrialRow>, ExportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        let raw = result.map_err(|source| ExportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(raw.into_row(path)?);
    }
    Ok(rows)
}

/// Parses a session JSON file back into its envelope.
pub fn read_json(path: &Path) -> Result<SessionDocument, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })
}
