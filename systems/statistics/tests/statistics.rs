use std::{cell::RefCell, rc::Rc, time::Duration};

use glam::Vec3;
use sorting_board_core::{
    BallColor, BallId, Event, HoleId, PlacementVerdict, SessionId, TargetHole, TrialId,
    TrialRecord,
};
use sorting_board_system_statistics::{Statistics, StatisticsError, StatisticsSnapshot};

fn target() -> TargetHole {
    TargetHole {
        hole: HoleId::new(0),
        color: BallColor::Red,
        diameter: 160.0,
        center: Vec3::ZERO,
    }
}

fn finalized(trial: u64, success: bool, error: f32, seconds: u64) -> TrialRecord {
    let mut record = TrialRecord::new(
        SessionId::new("test"),
        TrialId::new(trial),
        Duration::ZERO,
        BallColor::Red,
        120.0,
    );
    let verdict = if success {
        PlacementVerdict::success(target(), error)
    } else {
        PlacementVerdict::dropped(error)
    };
    record
        .finalize(Duration::from_secs(seconds), &verdict)
        .expect("finalize fresh record");
    record
}

fn finalized_event(record: TrialRecord) -> Event {
    Event::TrialFinalized {
        ball: BallId::new(0),
        record,
        position: Vec3::ZERO,
    }
}

#[test]
fn accuracy_is_zero_without_trials() {
    let statistics = Statistics::new();
    assert_eq!(statistics.summary().accuracy, 0.0);
    assert_eq!(statistics.summary().total, 0);
}

#[test]
fn reset_discards_previous_trials() {
    let mut statistics = Statistics::new();
    for trial in 1..=2 {
        statistics
            .record_finalized(&finalized(trial, false, 300.0, 2))
            .expect("record failure");
    }
    statistics.reset();
    for trial in 1..=3 {
        statistics
            .record_finalized(&finalized(trial, true, 10.0, 2))
            .expect("record success");
    }

    let summary = statistics.summary();
    assert_eq!(summary.total, 3, "only trials after reset count");
    assert_eq!(summary.successes, 3);
    assert_eq!(summary.failures, 0);
    assert!((summary.accuracy - 100.0).abs() < 1e-9);
}

#[test]
fn unfinalized_records_are_rejected() {
    let mut statistics = Statistics::new();
    let record = TrialRecord::new(
        SessionId::new("test"),
        TrialId::new(7),
        Duration::ZERO,
        BallColor::Blue,
        120.0,
    );
    assert_eq!(
        statistics.record_finalized(&record),
        Err(StatisticsError::Unfinalized {
            trial: TrialId::new(7)
        })
    );
    assert_eq!(statistics.snapshot(), StatisticsSnapshot::default());
}

#[test]
fn throughput_uses_time_advanced_events() {
    let mut statistics = Statistics::new();
    let mut forwarded = Vec::new();
    let events = vec![
        Event::TimeAdvanced {
            dt: Duration::from_secs(20),
        },
        finalized_event(finalized(1, true, 5.0, 3)),
        Event::TimeAdvanced {
            dt: Duration::from_secs(10),
        },
        finalized_event(finalized(2, false, 95.0, 5)),
    ];
    statistics.handle(&events, &mut forwarded);

    assert_eq!(forwarded.len(), 2);
    assert_eq!(forwarded[0].trial(), TrialId::new(1));
    let summary = statistics.summary();
    assert_eq!(summary.level_time, Duration::from_secs(30));
    assert!((summary.throughput - 4.0).abs() < 1e-9);
    assert!((summary.mean_error - 50.0).abs() < 1e-9);
    assert_eq!(summary.mean_duration, Duration::from_secs(4));
    assert!((summary.accuracy - 50.0).abs() < 1e-9);
}

#[test]
fn last_n_window_only_covers_recent_trials() {
    let mut statistics = Statistics::new();
    statistics
        .record_finalized(&finalized(1, false, 200.0, 1))
        .expect("record");
    statistics
        .record_finalized(&finalized(2, true, 20.0, 1))
        .expect("record");
    statistics
        .record_finalized(&finalized(3, true, 40.0, 1))
        .expect("record");

    let window = statistics.summary_of_last(2);
    assert_eq!(window.total, 2);
    assert!((window.accuracy - 100.0).abs() < 1e-9);
    assert!((window.mean_error - 30.0).abs() < 1e-9);
    assert_eq!(statistics.summary_of_last(10).total, 3);
}

#[test]
fn observers_are_notified_until_unsubscribed() {
    let mut statistics = Statistics::new();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let subscription = statistics.subscribe_updates(move |snapshot: &StatisticsSnapshot| {
        sink.borrow_mut().push(snapshot.total());
    });

    statistics
        .record_finalized(&finalized(1, true, 0.0, 1))
        .expect("record");
    assert!(statistics.unsubscribe_updates(subscription));
    statistics
        .record_finalized(&finalized(2, true, 0.0, 1))
        .expect("record");

    assert_eq!(*calls.borrow(), vec![1], "exactly one update before unsubscribe");
}

#[test]
fn summary_is_published_once_per_call() {
    let mut statistics = Statistics::new();
    let published = Rc::new(RefCell::new(0_u32));
    let sink = Rc::clone(&published);
    let _ = statistics.subscribe_summary(move |_| *sink.borrow_mut() += 1);

    statistics
        .record_finalized(&finalized(1, true, 0.0, 1))
        .expect("record");
    let summary = statistics.publish_summary();

    assert_eq!(*published.borrow(), 1);
    assert_eq!(statistics.last_summary(), Some(summary));
}
