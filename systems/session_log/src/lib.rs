#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-session buffering and export of finalized trials.
//!
//! Every finalized [`TrialRecord`] is buffered in arrival order. Exports
//! write `session_<id>.csv` and `session_<id>.json` into a dated folder
//! below the configured directory. Buffers whose export failed are kept
//! and retried on the next export so no trial is silently lost.

mod rows;

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use sorting_board_core::{ExportConfig, SessionId, TrialId, TrialRecord};
use thiserror::Error;

pub use crate::rows::{read_csv, read_json, SessionDocument, TrialRow};

const SESSION_STAMP: &str = "%Y%m%d_%H%M%S";
const EXPORT_STAMP: &str = "%Y-%m-%d %H:%M:%S";
const FOLDER_STAMP: &str = "%Y-%m-%d";

/// Errors raised while buffering or exporting session data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Export is enabled but nowhere to write.
    #[error("no export directory configured")]
    MissingDirectory,
    /// Only finalized trials are logged.
    #[error("trial {trial} has not been finalized")]
    Unfinalized {
        /// Identifier of the rejected trial.
        trial: TrialId,
    },
    /// Filesystem failure.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// CSV encoding or decoding failure.
    #[error("failed to process CSV file {path}: {source}")]
    Csv {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: csv::Error,
    },
    /// JSON encoding or decoding failure.
    #[error("failed to process JSON file {path}: {source}")]
    Json {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// A numeric cell could not be parsed.
    #[error("trial {trial} in {path} has a malformed {field} value")]
    Malformed {
        /// Path being read.
        path: PathBuf,
        /// Trial number of the offending row.
        trial: u64,
        /// Column holding the malformed value.
        field: &'static str,
    },
}

/// Source of local wall-clock time for session identifiers and stamps.
pub trait WallClock {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// [`WallClock`] backed by the system's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl WallClock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Files written by a successful export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Every file written, CSV before JSON, oldest session first.
    pub paths: Vec<PathBuf>,
    /// Number of trials written across all sessions.
    pub trials: usize,
}

impl ExportSummary {
    /// Reports whether nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug)]
struct SessionBuffer {
    session: SessionId,
    started: NaiveDateTime,
    records: Vec<TrialRecord>,
}

/// Buffers finalized trials and exports them per session.
#[derive(Debug)]
pub struct SessionLog<C = LocalClock> {
    clock: C,
    export: ExportConfig,
    last_stamp: String,
    repeats: u32,
    current: SessionBuffer,
    pending: Vec<SessionBuffer>,
}

impl SessionLog<LocalClock> {
    /// Creates a log stamped with the local time zone.
    #[must_use]
    pub fn new(export: ExportConfig) -> Self {
        Self::with_clock(export, LocalClock)
    }
}

impl<C: WallClock> SessionLog<C> {
    /// Creates a log reading wall-clock time from `clock`.
    pub fn with_clock(export: ExportConfig, clock: C) -> Self {
        let started = clock.now();
        let mut log = Self {
            clock,
            export,
            last_stamp: String::new(),
            repeats: 0,
            current: SessionBuffer {
                session: SessionId::new(String::new()),
                started,
                records: Vec::new(),
            },
            pending: Vec::new(),
        };
        log.current.session = log.next_session_id(started);
        info!(
            "session log ready: session {}, export {}",
            log.current.session,
            log.destination_label()
        );
        log
    }

    /// Identifier of the session currently being buffered.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.current.session
    }

    /// Number of trials buffered for the current session.
    #[must_use]
    pub fn trial_count(&self) -> usize {
        self.current.records.len()
    }

    /// Trials buffered for the current session, in arrival order.
    #[must_use]
    pub fn records(&self) -> &[TrialRecord] {
        &self.current.records
    }

    /// Number of earlier sessions still waiting for a successful export.
    #[must_use]
    pub fn pending_sessions(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether exports write any files.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.export.enabled && (self.export.csv || self.export.json)
    }

    /// Appends a finalized trial to the current session.
    pub fn record(&mut self, record: TrialRecord) -> Result<(), ExportError> {
        if !record.is_finalized() {
            return Err(ExportError::Unfinalized {
                trial: record.trial(),
            });
        }
        debug!(
            "logged trial {} ({}, {:?})",
            record.trial(),
            record.ball_color(),
            record.outcome()
        );
        self.current.records.push(record);
        Ok(())
    }

    /// Writes every pending session and then the current one.
    ///
    /// The current buffer is kept, so a later export rewrites the same files
    /// with any trials added since. Empty buffers write nothing.
    pub fn export_session(&mut self) -> Result<ExportSummary, ExportError> {
        let mut summary = ExportSummary::default();
        if !self.is_enabled() {
            return Ok(summary);
        }

        while let Some(buffer) = self.pending.first() {
            self.write_buffer(buffer, &mut summary)?;
            let _ = self.pending.remove(0);
        }
        self.write_buffer(&self.current, &mut summary)?;

        if !summary.is_empty() {
            info!(
                "exported {} trials to {} files",
                summary.trials,
                summary.paths.len()
            );
        }
        Ok(summary)
    }

    /// Exports the current session and begins a new one.
    ///
    /// The new session is active even when the export fails; the previous
    /// trials are then retained and retried on the next export.
    pub fn start_new_session(&mut self) -> Result<ExportSummary, ExportError> {
        let result = if self.current.records.is_empty() {
            Ok(ExportSummary::default())
        } else {
            self.export_session()
        };

        let started = self.clock.now();
        let session = self.next_session_id(started);
        let previous = std::mem::replace(
            &mut self.current,
            SessionBuffer {
                session,
                started,
                records: Vec::new(),
            },
        );
        if let Err(error) = &result {
            if !previous.records.is_empty() {
                warn!(
                    "keeping {} trials of session {} for retry: {error}",
                    previous.records.len(),
                    previous.session
                );
                self.pending.push(previous);
            }
        }
        info!("new session started: {}", self.current.session);
        result
    }

    fn next_session_id(&mut self, started: NaiveDateTime) -> SessionId {
        let stamp = started.format(SESSION_STAMP).to_string();
        if stamp == self.last_stamp {
            self.repeats += 1;
            SessionId::new(format!("{stamp}_{}", self.repeats))
        } else {
            self.last_stamp = stamp.clone();
            self.repeats = 1;
            SessionId::new(stamp)
        }
    }

    fn destination_label(&self) -> String {
        match (&self.export.directory, self.is_enabled()) {
            (_, false) => String::from("disabled"),
            (Some(directory), true) => directory.display().to_string(),
            (None, true) => String::from("<unset>"),
        }
    }

    fn write_buffer(
        &self,
        buffer: &SessionBuffer,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        if buffer.records.is_empty() {
            return Ok(());
        }
        let root = self
            .export
            .directory
            .as_deref()
            .ok_or(ExportError::MissingDirectory)?;
        // Files of one session share the folder of the day it started.
        let folder = root.join(buffer.started.format(FOLDER_STAMP).to_string());
        fs::create_dir_all(&folder).map_err(|source| ExportError::Io {
            path: folder.clone(),
            source,
        })?;

        let rows: Vec<TrialRow> = buffer.records.iter().map(TrialRow::from).collect();
        if self.export.csv {
            let path = session_file(&folder, &buffer.session, "csv");
            rows::write_csv(&path, &rows)?;
            summary.paths.push(path);
        }
        if self.export.json {
            let path = session_file(&folder, &buffer.session, "json");
            let document = SessionDocument {
                session_id: buffer.session.as_str().to_owned(),
                export_time: self.clock.now().format(EXPORT_STAMP).to_string(),
                total_trials: rows.len(),
                trials: rows,
            };
            rows::write_json(&path, &document)?;
            summary.paths.push(path);
        }
        summary.trials += buffer.records.len();
        Ok(())
    }
}

fn session_file(folder: &Path, session: &SessionId, extension: &str) -> PathBuf {
    folder.join(format!("session_{session}.{extension}"))
}
