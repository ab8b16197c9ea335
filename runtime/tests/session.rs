use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use sorting_board_core::{Event, ExportConfig, GameState, LevelConfig};
use sorting_board_rendering::{NullRenderer, SilentAudio};
use sorting_board_runtime::{autoplay::AutoPlayer, Session, SessionOptions};
use sorting_board_system_level::LevelRequest;
use sorting_board_world::query;

const FRAME: Duration = Duration::from_micros(16_667);

fn level(export: ExportConfig) -> LevelConfig {
    LevelConfig {
        total_trials: 5,
        spawn_interval: 0.2,
        settle_time: 0.0,
        auto_start_delay: 0.0,
        seed: Some(11),
        export,
        ..LevelConfig::default()
    }
}

fn exporting_to(directory: &Path) -> ExportConfig {
    ExportConfig {
        directory: Some(directory.to_path_buf()),
        ..ExportConfig::default()
    }
}

fn offline() -> ExportConfig {
    ExportConfig {
        enabled: false,
        ..ExportConfig::default()
    }
}

fn step(session: &mut Session, player: &mut AutoPlayer) {
    for event in player.drive(session.world()) {
        session.push_pointer(event);
    }
    session.tick(FRAME, &mut NullRenderer, &mut SilentAudio);
}

fn play_until<P>(session: &mut Session, player: &mut AutoPlayer, mut done: P) -> Vec<Event>
where
    P: FnMut(&Session) -> bool,
{
    let mut log = Vec::new();
    for _ in 0..10_000 {
        step(session, player);
        log.extend_from_slice(session.last_events());
        if done(session) {
            return log;
        }
    }
    panic!("session never reached the expected state");
}

fn exported_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(exported_files(&path, extension));
        } else if path.extension().is_some_and(|ext| ext == extension) {
            found.push(path);
        }
    }
    found
}

#[test]
fn autoplay_completes_the_level_exactly_once() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut session =
        Session::new(level(exporting_to(directory.path())), SessionOptions::default())
            .expect("valid level");
    let mut player = AutoPlayer::new(3, 0.0);

    let mut log = play_until(&mut session, &mut player, |session| {
        session.game_state() == GameState::LevelComplete
    });
    for _ in 0..30 {
        step(&mut session, &mut player);
        log.extend_from_slice(session.last_events());
    }

    let completions = log
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::GameStateChanged {
                    to: GameState::LevelComplete,
                    ..
                }
            )
        })
        .count();
    assert_eq!(completions, 1, "level completes exactly once");

    let summary = session
        .statistics()
        .last_summary()
        .expect("summary published on completion");
    assert_eq!(summary.total, 5);
    assert_eq!(summary.successes, 5);
    assert!((summary.accuracy - 100.0).abs() < 1e-9);
    assert!(summary.level_time > Duration::ZERO);

    assert_eq!(session.session_log().trial_count(), 5);
    assert_eq!(exported_files(directory.path(), "csv").len(), 1);
    assert_eq!(exported_files(directory.path(), "json").len(), 1);
}

#[test]
fn misses_are_recorded_as_failures() {
    let mut session =
        Session::new(level(offline()), SessionOptions::default()).expect("valid level");
    let mut player = AutoPlayer::new(5, 1.0);
    let _ = play_until(&mut session, &mut player, |session| {
        session.game_state() == GameState::LevelComplete
    });

    let snapshot = session.statistics().snapshot();
    assert_eq!(snapshot.total(), 5);
    assert_eq!(snapshot.failures(), 5);
    assert_eq!(snapshot.accuracy(), 0.0);
    assert!(snapshot.mean_error() > 0.0);
}

#[test]
fn pause_freezes_game_time() {
    let mut session =
        Session::new(level(offline()), SessionOptions::default()).expect("valid level");
    let mut player = AutoPlayer::new(1, 0.0);
    let _ = play_until(&mut session, &mut player, |session| {
        query::spawned_count(session.world()) >= 2
    });

    session.request(LevelRequest::TogglePause);
    step(&mut session, &mut player);
    assert_eq!(session.game_state(), GameState::Paused);

    let clock = query::clock(session.world());
    let elapsed = session.statistics().snapshot().elapsed();
    let spawned = query::spawned_count(session.world());
    for _ in 0..120 {
        step(&mut session, &mut player);
    }
    assert_eq!(query::clock(session.world()), clock);
    assert_eq!(session.statistics().snapshot().elapsed(), elapsed);
    assert_eq!(query::spawned_count(session.world()), spawned);

    session.request(LevelRequest::TogglePause);
    step(&mut session, &mut player);
    assert_eq!(session.game_state(), GameState::Playing);
    assert!(query::clock(session.world()) > clock);
}

#[test]
fn restart_begins_a_fresh_session() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut session =
        Session::new(level(exporting_to(directory.path())), SessionOptions::default())
            .expect("valid level");
    let mut player = AutoPlayer::new(9, 0.0);
    let _ = play_until(&mut session, &mut player, |session| {
        session.statistics().snapshot().total() >= 2
    });
    let first_session = session.session_log().session_id().clone();

    session.request(LevelRequest::Restart);
    step(&mut session, &mut player);

    assert_eq!(session.game_state(), GameState::Playing);
    assert_ne!(session.session_log().session_id(), &first_session);
    assert_eq!(query::session(session.world()), session.session_log().session_id());
    assert_eq!(session.statistics().snapshot().total(), 0);
    assert_eq!(exported_files(directory.path(), "csv").len(), 1);

    let _ = play_until(&mut session, &mut player, |session| {
        session.game_state() == GameState::LevelComplete
    });
    assert_eq!(session.statistics().snapshot().total(), 5);
}

#[test]
fn exit_flushes_the_log() {
    let directory = tempfile::tempdir().expect("tempdir");
    let mut session =
        Session::new(level(exporting_to(directory.path())), SessionOptions::default())
            .expect("valid level");
    let mut player = AutoPlayer::new(2, 0.0);
    let _ = play_until(&mut session, &mut player, |session| {
        session.statistics().snapshot().total() >= 1
    });

    session.request(LevelRequest::Exit);
    step(&mut session, &mut player);

    assert!(session.is_exiting());
    assert_eq!(exported_files(directory.path(), "json").len(), 1);
}

#[test]
fn invalid_requests_leave_the_level_untouched() {
    let config = LevelConfig {
        auto_start_delay: 5.0,
        ..level(offline())
    };
    let mut session = Session::new(config, SessionOptions::default()).expect("valid level");
    session.request(LevelRequest::Restart);
    session.request(LevelRequest::TogglePause);
    session.tick(FRAME, &mut NullRenderer, &mut SilentAudio);

    assert_eq!(session.game_state(), GameState::Initializing);
    assert!(session.last_events().is_empty());
}

#[test]
fn invalid_level_is_refused() {
    let config = LevelConfig {
        holes: Vec::new(),
        ..level(offline())
    };
    assert!(Session::new(config, SessionOptions::default()).is_err());
}
