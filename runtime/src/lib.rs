#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Explicit session context wiring the Sorting Board systems together.
//!
//! A [`Session`] owns the world and every system, and advances them on one
//! timeline. Each call to [`Session::tick`] runs, in order: queued level
//! requests and the auto-start timer, the game clock, spawning, pointer
//! input, placement evaluation, statistics and session logging, level
//! completion and error checks, and finally presentation.

pub mod autoplay;

use std::{collections::VecDeque, time::Duration};

use log::{error, info, warn};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sorting_board_core::{Command, Event, GameState, LevelConfig};
use sorting_board_rendering::{AudioCues, BoardRenderer, HudView, Presenter};
use sorting_board_system_bootstrap::{Bootstrap, SetupError};
use sorting_board_system_interaction::{Interaction, PointerEvent};
use sorting_board_system_level::{
    LevelAction, LevelController, LevelRequest, DEFAULT_ERROR_THRESHOLD,
};
use sorting_board_system_placement::Placement;
use sorting_board_system_session_log::SessionLog;
use sorting_board_system_spawning::{Config as SpawnConfig, SpawnProgress, Spawning};
use sorting_board_system_statistics::Statistics;
use sorting_board_world::{self as world, query, World};
use thiserror::Error;

/// Seed mixed into the presenter so bounces do not mirror spawn colors.
const PRESENTER_SEED_SALT: u64 = 0x5eed_b0a2_d000_0001;

/// Errors raised while creating a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Setup detected an invalid or incomplete level.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Tunables that are not part of the level configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Seed overriding the level's seed.
    pub seed: Option<u64>,
    /// Consecutive errors that trigger a level recovery.
    pub error_threshold: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            seed: None,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

/// One running instance of the level.
#[derive(Debug)]
pub struct Session {
    world: World,
    seed: u64,
    spawning: Spawning,
    interaction: Interaction,
    placement: Placement,
    statistics: Statistics,
    session_log: SessionLog,
    level: LevelController,
    presenter: Presenter,
    pointer: Vec<PointerEvent>,
    requests: VecDeque<LevelRequest>,
    last_events: Vec<Event>,
    export_failed: bool,
}

impl Session {
    /// Validates the level and prepares every system.
    pub fn new(config: LevelConfig, options: SessionOptions) -> Result<Self, SessionError> {
        let seed = options
            .seed
            .or(config.seed)
            .unwrap_or_else(|| ChaCha8Rng::from_entropy().next_u64());
        let spawn_config = SpawnConfig::from_level(&config, seed);
        let auto_start = config.auto_start_delay();
        let session_log = SessionLog::new(config.export.clone());
        let mut world = Bootstrap.prepare(config)?;

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::BeginSession {
                session: session_log.session_id().clone(),
            },
            &mut events,
        );

        let mut level = LevelController::with_error_threshold(options.error_threshold);
        level.setup_complete(auto_start);
        info!("session created with seed {seed}");

        Ok(Self {
            world,
            seed,
            spawning: Spawning::new(spawn_config),
            interaction: Interaction::new(),
            placement: Placement::new(),
            statistics: Statistics::new(),
            session_log,
            level,
            presenter: Presenter::new(seed ^ PRESENTER_SEED_SALT),
            pointer: Vec::new(),
            requests: VecDeque::new(),
            last_events: events,
            export_failed: false,
        })
    }

    /// Seed driving spawn colors, positions and bounces.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current level state.
    #[must_use]
    pub fn game_state(&self) -> GameState {
        query::game_state(&self.world)
    }

    /// Reports whether the level is shutting down.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.game_state() == GameState::Exiting
    }

    /// Running statistics.
    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Running statistics, for registering observers.
    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    /// Session data log.
    #[must_use]
    pub fn session_log(&self) -> &SessionLog {
        &self.session_log
    }

    /// Level orchestrator.
    #[must_use]
    pub fn level(&self) -> &LevelController {
        &self.level
    }

    /// Events produced by the most recent tick, in order.
    #[must_use]
    pub fn last_events(&self) -> &[Event] {
        &self.last_events
    }

    /// Queues pointer input for the next tick.
    pub fn push_pointer(&mut self, event: PointerEvent) {
        self.pointer.push(event);
    }

    /// Queues a level request for the next tick.
    pub fn request(&mut self, request: LevelRequest) {
        self.requests.push_back(request);
    }

    /// Values for the heads-up display.
    #[must_use]
    pub fn hud_view(&self) -> HudView {
        let snapshot = self.statistics.snapshot();
        HudView {
            state: self.game_state(),
            accuracy: snapshot.accuracy(),
            mean_error: snapshot.mean_error(),
            mean_seconds: snapshot.mean_duration().as_secs_f64(),
            throughput: snapshot.throughput(),
            completed: snapshot.total(),
            successes: snapshot.successes(),
            total_trials: query::target_count(&self.world),
            session: self.session_log.session_id().to_string(),
        }
    }

    /// Advances the session by one frame of `dt` and presents the result.
    pub fn tick<R, A>(&mut self, dt: Duration, renderer: &mut R, audio: &mut A)
    where
        R: BoardRenderer + ?Sized,
        A: AudioCues + ?Sized,
    {
        let mut events = Vec::new();
        let mut actions = Vec::new();

        let state = self.game_state();
        self.level.poll_auto_start(dt, state, &mut actions);
        self.execute(&mut actions, &mut events);
        while let Some(request) = self.requests.pop_front() {
            let state = self.game_state();
            if self.level.request(request, state, &mut actions).is_err() {
                continue;
            }
            self.execute(&mut actions, &mut events);
        }

        self.apply(Command::Tick { dt }, &mut events);

        let mut commands = Vec::new();
        let progress = SpawnProgress {
            spawned: query::spawned_count(&self.world),
            target: query::target_count(&self.world),
        };
        self.spawning.handle(&events, progress, &mut commands);
        self.apply_all(&mut commands, &mut events);

        let pointer = std::mem::take(&mut self.pointer);
        let state = self.game_state();
        self.interaction.handle(
            &pointer,
            state,
            &query::ball_view(&self.world),
            &mut commands,
        );
        self.apply_all(&mut commands, &mut events);

        self.placement.handle(
            &events,
            query::holes(&self.world),
            &query::ball_view(&self.world),
            &mut commands,
        );
        self.apply_all(&mut commands, &mut events);

        let mut finalized = Vec::new();
        self.statistics.handle(&events, &mut finalized);
        for record in finalized {
            if let Err(error) = self.session_log.record(record) {
                warn!("trial not logged: {error}");
            }
        }

        let state = self.game_state();
        let resolved = query::all_trials_resolved(&self.world);
        self.level.handle(&events, state, resolved, &mut actions);
        let mut produced = Vec::new();
        self.execute(&mut actions, &mut produced);
        if self.level.is_recovering() {
            let state = self.game_state();
            let resolved = query::all_trials_resolved(&self.world);
            self.level.handle(&produced, state, resolved, &mut actions);
            self.execute(&mut actions, &mut produced);
        }
        events.append(&mut produced);

        self.presenter.present(&events, renderer, audio);
        self.last_events = events;
    }

    fn apply(&mut self, command: Command, events: &mut Vec<Event>) {
        world::apply(&mut self.world, command, events);
    }

    fn apply_all(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn execute(&mut self, actions: &mut Vec<LevelAction>, events: &mut Vec<Event>) {
        for action in actions.drain(..) {
            match action {
                LevelAction::Transition(state) => {
                    self.apply(Command::SetGameState { state }, events);
                }
                LevelAction::StartSpawning => self.spawning.start(),
                LevelAction::StopSpawning => self.spawning.stop(),
                LevelAction::ClearBoard => {
                    self.interaction.reset();
                    self.apply(Command::ClearBoard, events);
                    self.apply(Command::HighlightHole { hole: None }, events);
                }
                LevelAction::ResetStatistics => self.statistics.reset(),
                LevelAction::StartNewSession => {
                    let outcome = self.session_log.start_new_session();
                    if let Err(error) = &outcome {
                        error!("session export failed: {error}");
                    }
                    self.export_failed = outcome.is_err();
                    self.level.export_result(outcome.is_ok());
                    let session = self.session_log.session_id().clone();
                    self.apply(Command::BeginSession { session }, events);
                }
                LevelAction::ExportSession => self.export(),
                LevelAction::PublishSummary => {
                    let _ = self.statistics.publish_summary();
                }
            }
        }
    }

    fn export(&mut self) {
        match self.session_log.export_session() {
            Ok(summary) => {
                for path in &summary.paths {
                    info!("session data written to {}", path.display());
                }
                self.export_failed = false;
                self.level.export_result(true);
            }
            Err(error) => {
                error!("session export failed: {error}");
                self.export_failed = true;
                self.level.export_result(false);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let buffered =
            self.session_log.trial_count() > 0 || self.session_log.pending_sessions() > 0;
        // A clean exit already flushed; a failed one gets a last retry.
        if !buffered || (self.is_exiting() && !self.export_failed) {
            return;
        }
        if let Err(error) = self.session_log.export_session() {
            error!("final session export failed: {error}");
        }
    }
}
