use std::time::Duration;

use glam::Vec3;
use sorting_board_core::{
    BallColor, BallId, Command, Event, GameState, InteractionRejection, LevelConfig,
    PlacementVerdict, SpawnRejection,
};
use sorting_board_system_level::{LevelAction, LevelController, LevelError, LevelRequest};
use sorting_board_world::{self as world, query, World};

fn spawn_rejected() -> Event {
    Event::SpawnRejected {
        reason: SpawnRejection::PoolExhausted,
    }
}

fn apply_transitions(world: &mut World, actions: &[LevelAction]) -> Vec<Event> {
    let mut events = Vec::new();
    for action in actions {
        if let LevelAction::Transition(state) = action {
            world::apply(world, Command::SetGameState { state: *state }, &mut events);
        }
    }
    events
}

#[test]
fn auto_start_fires_after_the_configured_delay() {
    let mut level = LevelController::new();
    level.setup_complete(Duration::from_secs(1));
    let mut actions = Vec::new();

    level.poll_auto_start(Duration::from_millis(600), GameState::Initializing, &mut actions);
    assert!(actions.is_empty());
    assert_eq!(
        level.auto_start_remaining(),
        Some(Duration::from_millis(400))
    );

    level.poll_auto_start(Duration::from_millis(400), GameState::Initializing, &mut actions);
    assert_eq!(
        actions,
        vec![
            LevelAction::Transition(GameState::Playing),
            LevelAction::StartSpawning
        ]
    );
    assert_eq!(level.auto_start_remaining(), None);
}

#[test]
fn explicit_start_cancels_the_auto_start() {
    let mut level = LevelController::new();
    level.setup_complete(Duration::from_secs(1));
    let mut actions = Vec::new();
    level
        .request(LevelRequest::Start, GameState::Initializing, &mut actions)
        .expect("start from initializing");
    actions.clear();

    level.poll_auto_start(Duration::from_secs(5), GameState::Playing, &mut actions);
    assert!(actions.is_empty(), "auto start must not fire twice");
}

#[test]
fn pause_toggles_and_exports() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    level
        .request(LevelRequest::TogglePause, GameState::Playing, &mut actions)
        .expect("pause");
    assert_eq!(
        actions,
        vec![
            LevelAction::Transition(GameState::Paused),
            LevelAction::ExportSession
        ]
    );

    actions.clear();
    level
        .request(LevelRequest::TogglePause, GameState::Paused, &mut actions)
        .expect("resume");
    assert_eq!(actions, vec![LevelAction::Transition(GameState::Playing)]);
}

#[test]
fn invalid_requests_are_refused_without_actions() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    assert_eq!(
        level.request(LevelRequest::Restart, GameState::Initializing, &mut actions),
        Err(LevelError::InvalidRequest {
            request: LevelRequest::Restart,
            state: GameState::Initializing
        })
    );
    assert!(level
        .request(LevelRequest::TogglePause, GameState::LevelComplete, &mut actions)
        .is_err());
    assert!(level
        .request(LevelRequest::Exit, GameState::Exiting, &mut actions)
        .is_err());
    assert!(actions.is_empty());
}

#[test]
fn restart_from_completion_resumes_play() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    level
        .request(LevelRequest::Restart, GameState::LevelComplete, &mut actions)
        .expect("restart");
    assert_eq!(
        actions,
        vec![
            LevelAction::StopSpawning,
            LevelAction::ClearBoard,
            LevelAction::ResetStatistics,
            LevelAction::StartNewSession,
            LevelAction::Transition(GameState::Playing),
            LevelAction::StartSpawning,
        ]
    );
}

#[test]
fn exit_flushes_before_terminating() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    level
        .request(LevelRequest::Exit, GameState::Paused, &mut actions)
        .expect("exit");
    assert_eq!(
        actions,
        vec![
            LevelAction::StopSpawning,
            LevelAction::ExportSession,
            LevelAction::Transition(GameState::Exiting),
        ]
    );
}

#[test]
fn completion_fires_exactly_once() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();

    level.handle(&[], GameState::Playing, false, &mut actions);
    assert!(actions.is_empty(), "unresolved trials keep the level running");

    level.handle(&[], GameState::Playing, true, &mut actions);
    assert_eq!(
        actions,
        vec![
            LevelAction::StopSpawning,
            LevelAction::Transition(GameState::LevelComplete),
            LevelAction::ExportSession,
            LevelAction::PublishSummary,
        ]
    );

    actions.clear();
    level.handle(&[], GameState::Playing, true, &mut actions);
    assert!(actions.is_empty());
    assert!(level.is_completed());
}

#[test]
fn successes_reset_the_error_counter() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    let spawned = Event::BallSpawned {
        ball: BallId::new(0),
        trial: sorting_board_core::TrialId::FIRST,
        color: BallColor::Red,
        size: 120.0,
        position: Vec3::ZERO,
    };
    level.handle(
        &[spawn_rejected(), spawn_rejected(), spawn_rejected(), spawn_rejected()],
        GameState::Playing,
        false,
        &mut actions,
    );
    assert_eq!(level.consecutive_errors(), 4);
    level.handle(&[spawned], GameState::Playing, false, &mut actions);
    assert_eq!(level.consecutive_errors(), 0);
    level.export_result(false);
    assert_eq!(level.consecutive_errors(), 1);
    assert!(actions.is_empty());
}

fn interaction_rejections(count: usize) -> Vec<Event> {
    (0..count)
        .map(|_| Event::InteractionRejected {
            ball: None,
            reason: InteractionRejection::UnknownBall,
        })
        .collect()
}

#[test]
fn five_consecutive_errors_trigger_recovery() {
    let mut world = World::new(LevelConfig::default());
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    let _ = apply_transitions(&mut world, &[LevelAction::Transition(GameState::Playing)]);

    level.handle(
        &interaction_rejections(5),
        query::game_state(&world),
        false,
        &mut actions,
    );
    assert_eq!(
        actions,
        vec![
            LevelAction::Transition(GameState::Paused),
            LevelAction::StopSpawning,
            LevelAction::ClearBoard,
            LevelAction::ResetStatistics,
            LevelAction::StartNewSession,
            LevelAction::Transition(GameState::Playing),
            LevelAction::StartSpawning,
        ]
    );
    assert!(level.is_recovering());
    assert_eq!(level.consecutive_errors(), 0);

    let produced = apply_transitions(&mut world, &actions);
    actions.clear();
    level.handle(&produced, query::game_state(&world), false, &mut actions);
    assert!(actions.is_empty(), "successful recovery needs no follow-up");
    assert!(!level.is_recovering());
    assert_eq!(query::game_state(&world), GameState::Playing);
}

#[test]
fn errors_while_paused_wait_for_play_to_resume() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();

    for state in [GameState::Paused, GameState::LevelComplete, GameState::Initializing] {
        level.handle(&interaction_rejections(5), state, false, &mut actions);
        assert!(actions.is_empty(), "no recovery while {state:?}");
        assert!(!level.is_recovering());
    }
    assert_eq!(level.consecutive_errors(), 15);

    level.handle(&[], GameState::Playing, false, &mut actions);
    assert_eq!(actions.first(), Some(&LevelAction::Transition(GameState::Paused)));
    assert!(actions.contains(&LevelAction::StartNewSession));
    assert!(level.is_recovering());
}

#[test]
fn export_failures_while_paused_do_not_end_the_level() {
    let mut world = World::new(LevelConfig::default());
    let mut level = LevelController::new();
    let mut actions = Vec::new();
    let _ = apply_transitions(
        &mut world,
        &[
            LevelAction::Transition(GameState::Playing),
            LevelAction::Transition(GameState::Paused),
        ],
    );

    for _ in 0..5 {
        level.export_result(false);
    }
    level.handle(&[], query::game_state(&world), false, &mut actions);
    assert!(actions.is_empty());
    assert_eq!(query::game_state(&world), GameState::Paused);

    level
        .request(LevelRequest::TogglePause, GameState::Paused, &mut actions)
        .expect("resume");
    let mut produced = apply_transitions(&mut world, &actions);
    actions.clear();
    level.handle(&produced, query::game_state(&world), false, &mut actions);
    assert!(level.is_recovering());

    produced = apply_transitions(&mut world, &actions);
    assert!(produced.iter().all(|event| !event.is_rejection()));
    actions.clear();
    level.handle(&produced, query::game_state(&world), false, &mut actions);
    assert!(actions.is_empty());
    assert!(!level.is_recovering());
    assert_eq!(query::game_state(&world), GameState::Playing);
}

#[test]
fn recovery_that_does_not_resume_play_forces_exit() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();

    level.handle(&vec![spawn_rejected(); 5], GameState::Playing, false, &mut actions);
    assert!(level.is_recovering());

    actions.clear();
    level.handle(&[], GameState::Paused, false, &mut actions);
    assert_eq!(
        actions,
        vec![
            LevelAction::StopSpawning,
            LevelAction::ExportSession,
            LevelAction::Transition(GameState::Exiting),
        ]
    );
    assert!(!level.is_recovering());
}

#[test]
fn recovery_interrupted_by_exit_adds_nothing() {
    let mut level = LevelController::new();
    let mut actions = Vec::new();

    level.handle(&vec![spawn_rejected(); 5], GameState::Playing, false, &mut actions);
    actions.clear();
    level.handle(&[], GameState::Exiting, false, &mut actions);
    assert!(actions.is_empty());
    assert!(!level.is_recovering());
}

#[test]
fn world_completion_is_detected_once_every_trial_resolves() {
    let mut world = World::new(LevelConfig {
        total_trials: 2,
        settle_time: 0.0,
        ..LevelConfig::default()
    });
    let mut level = LevelController::new();
    let _ = apply_transitions(&mut world, &[LevelAction::Transition(GameState::Playing)]);

    let mut balls = Vec::new();
    for _ in 0..2 {
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SpawnBall {
                color: BallColor::Red,
                position: Vec3::new(0.0, 900.0, 0.0),
            },
            &mut events,
        );
        balls.extend(events.iter().filter_map(|event| match event {
            Event::BallSpawned { ball, .. } => Some(*ball),
            _ => None,
        }));
    }
    assert_eq!(balls.len(), 2);

    let mut actions = Vec::new();
    for (index, ball) in balls.iter().enumerate() {
        let mut events = Vec::new();
        world::apply(&mut world, Command::GraspBall { ball: *ball }, &mut events);
        world::apply(
            &mut world,
            Command::ReleaseBall {
                ball: *ball,
                position: Vec3::ZERO,
            },
            &mut events,
        );
        world::apply(
            &mut world,
            Command::FinalizeTrial {
                ball: *ball,
                verdict: PlacementVerdict::dropped(10.0),
            },
            &mut events,
        );
        level.handle(
            &events,
            query::game_state(&world),
            query::all_trials_resolved(&world),
            &mut actions,
        );
        if index == 0 {
            assert!(actions.is_empty(), "one of two resolved is not complete");
        }
    }
    assert_eq!(
        actions
            .iter()
            .filter(|action| **action == LevelAction::Transition(GameState::LevelComplete))
            .count(),
        1
    );
}
