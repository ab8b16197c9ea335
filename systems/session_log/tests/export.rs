use std::{fs, path::Path, time::Duration};

use glam::Vec3;
use sorting_board_core::{
    BallColor, ExportConfig, HoleId, Outcome, PlacementVerdict, SessionId, TargetHole, TrialId,
    TrialRecord,
};
use sorting_board_system_session_log::{read_csv, read_json, ExportError, SessionLog};

fn record(session: &SessionId, trial: u64, verdict: PlacementVerdict) -> TrialRecord {
    let mut record = TrialRecord::new(
        session.clone(),
        TrialId::new(trial),
        Duration::from_millis(trial * 1_000),
        BallColor::Red,
        60.0,
    );
    record
        .mark_grasped(Duration::from_millis(trial * 1_000 + 400))
        .expect("grasp");
    record
        .finalize(Duration::from_millis(trial * 1_000 + 1_234), &verdict)
        .expect("finalize");
    record
}

fn success(error: f32) -> PlacementVerdict {
    PlacementVerdict::success(
        TargetHole {
            hole: HoleId::new(0),
            color: BallColor::Red,
            diameter: 100.0,
            center: Vec3::new(-250.0, 900.0, 0.0),
        },
        error,
    )
}

fn export_config(directory: &Path) -> ExportConfig {
    ExportConfig {
        directory: Some(directory.to_path_buf()),
        ..ExportConfig::default()
    }
}

fn find(paths: &[std::path::PathBuf], extension: &str) -> std::path::PathBuf {
    paths
        .iter()
        .find(|path| path.extension().is_some_and(|ext| ext == extension))
        .cloned()
        .expect("export path present")
}

#[test]
fn csv_and_json_exports_agree() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut log = SessionLog::new(export_config(directory.path()));
    let session = log.session_id().clone();
    log.record(record(&session, 1, success(0.004)))
        .expect("record success");
    log.record(record(&session, 2, PlacementVerdict::dropped(200.0)))
        .expect("record drop");
    log.record(record(&session, 3, success(33.337)))
        .expect("record success");

    let summary = log.export_session().expect("export");
    assert_eq!(summary.trials, 3);
    assert_eq!(summary.paths.len(), 2);

    let csv_path = find(&summary.paths, "csv");
    let json_path = find(&summary.paths, "json");
    assert_eq!(
        csv_path.file_name().and_then(|name| name.to_str()),
        Some(format!("session_{session}.csv").as_str())
    );

    let from_csv = read_csv(&csv_path).expect("read csv");
    let document = read_json(&json_path).expect("read json");
    assert_eq!(document.session_id, session.as_str());
    assert_eq!(document.total_trials, 3);
    assert_eq!(from_csv, document.trials, "both formats carry identical rows");

    let tuples: Vec<_> = from_csv
        .iter()
        .map(|row| (row.trial_id, row.outcome, row.placement_error_px))
        .collect();
    assert_eq!(
        tuples,
        vec![
            (1, Some(Outcome::Success), 0.0),
            (2, Some(Outcome::Dropped), 200.0),
            (3, Some(Outcome::Success), 33.34),
        ]
    );
    assert_eq!(from_csv[1].target_color, None);
    assert_eq!(from_csv[0].target_size, Some(100.0));
    assert_eq!(from_csv[0].completion_time, Some(1.234));
}

#[test]
fn csv_header_uses_persisted_column_order() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut log = SessionLog::new(ExportConfig {
        json: false,
        ..export_config(directory.path())
    });
    let session = log.session_id().clone();
    log.record(record(&session, 1, PlacementVerdict::dropped(12.5)))
        .expect("record");
    let summary = log.export_session().expect("export");
    assert_eq!(summary.paths.len(), 1);

    let contents = fs::read_to_string(&summary.paths[0]).expect("read csv");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some(
            "session_id,trial_id,spawn_time,grasp_time,release_time,completion_time,\
             ball_color,ball_size,target_color,target_size,placement_error_px,outcome"
        )
    );
    assert_eq!(
        lines.next(),
        Some(format!("{session},1,1.000,1.400,2.234,1.234,Red,60.0,,,12.50,Dropped").as_str())
    );
}

#[test]
fn empty_session_exports_nothing() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut log = SessionLog::new(export_config(directory.path()));
    let summary = log.export_session().expect("export");
    assert!(summary.is_empty());
}

#[test]
fn unfinalized_records_are_refused() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut log = SessionLog::new(export_config(directory.path()));
    let open = TrialRecord::new(
        log.session_id().clone(),
        TrialId::new(1),
        Duration::ZERO,
        BallColor::Blue,
        60.0,
    );
    assert!(matches!(
        log.record(open),
        Err(ExportError::Unfinalized { .. })
    ));
    assert_eq!(log.trial_count(), 0);
}

#[test]
fn failed_export_is_retried_with_the_next_session() {
    let directory = tempfile::tempdir().expect("tempdir");
    let blocked = directory.path().join("logs");
    fs::write(&blocked, b"not a directory").expect("create blocker");

    let mut log = SessionLog::new(export_config(&blocked));
    let first = log.session_id().clone();
    log.record(record(&first, 1, success(1.0)))
        .expect("record");

    assert!(log.start_new_session().is_err());
    assert_ne!(log.session_id(), &first, "new session starts regardless");
    assert_eq!(log.trial_count(), 0);
    assert_eq!(log.pending_sessions(), 1);

    fs::remove_file(&blocked).expect("remove blocker");
    let second = log.session_id().clone();
    log.record(record(&second, 1, PlacementVerdict::dropped(80.0)))
        .expect("record");
    let summary = log.export_session().expect("export after recovery");

    assert_eq!(summary.trials, 2);
    assert_eq!(log.pending_sessions(), 0);
    let csv_files: Vec<_> = summary
        .paths
        .iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    assert_eq!(csv_files.len(), 2);
    let retried = read_csv(csv_files[0]).expect("read retried session");
    assert_eq!(retried[0].session_id, first.as_str());
}
