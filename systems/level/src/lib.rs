#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level orchestration: start, pause, restart, completion and exit.
//!
//! The controller never touches the world directly. It consumes requests
//! and world events and emits [`LevelAction`]s which the runtime executes in
//! order. Completion fires exactly once per session, and a run of
//! consecutive error signals triggers an automatic recovery while playing.
//! Recovery starts a fresh session so the summary always matches the log.

use std::{fmt, time::Duration};

use log::{info, warn};
use sorting_board_core::{Event, GameState, Scheduler, TaskHandle};
use thiserror::Error;

/// Number of consecutive error signals that triggers recovery.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 5;

/// Requests issued by the player or the hosting adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelRequest {
    /// Leave initialization and begin playing.
    Start,
    /// Pause while playing, resume while paused.
    TogglePause,
    /// Reset the level and start a new session.
    Restart,
    /// Flush session data and shut down.
    Exit,
}

impl fmt::Display for LevelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::TogglePause => "toggle pause",
            Self::Restart => "restart",
            Self::Exit => "exit",
        };
        f.write_str(label)
    }
}

/// Side effects the runtime performs on behalf of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelAction {
    /// Request a game state transition from the world.
    Transition(GameState),
    /// Begin the spawn cadence.
    StartSpawning,
    /// Cancel any pending spawn.
    StopSpawning,
    /// Return every active ball to the pool.
    ClearBoard,
    /// Zero the statistics accumulators.
    ResetStatistics,
    /// Export the current session and begin a new one.
    StartNewSession,
    /// Export the current session.
    ExportSession,
    /// Publish the level summary to observers.
    PublishSummary,
}

/// Errors returned for requests that are invalid in the current state.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// The request has no meaning in the current state and was ignored.
    #[error("cannot {request} while {state:?}")]
    InvalidRequest {
        /// Request that was refused.
        request: LevelRequest,
        /// State the level was in.
        state: GameState,
    },
}

/// Pure state machine orchestrating the level.
#[derive(Debug)]
pub struct LevelController {
    threshold: u32,
    consecutive_errors: u32,
    completed: bool,
    recovering: Option<GameState>,
    auto_start: Scheduler<()>,
    auto_start_task: Option<TaskHandle>,
}

impl Default for LevelController {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelController {
    /// Creates a controller using [`DEFAULT_ERROR_THRESHOLD`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_error_threshold(DEFAULT_ERROR_THRESHOLD)
    }

    /// Creates a controller that recovers after `threshold` consecutive errors.
    #[must_use]
    pub fn with_error_threshold(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_errors: 0,
            completed: false,
            recovering: None,
            auto_start: Scheduler::new(),
            auto_start_task: None,
        }
    }

    /// Number of error signals observed since the last success.
    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Reports whether the current session reached completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Reports whether a recovery was issued and awaits confirmation.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.recovering.is_some()
    }

    /// Time left before the automatic start, if one is scheduled.
    #[must_use]
    pub fn auto_start_remaining(&self) -> Option<Duration> {
        self.auto_start_task
            .and_then(|task| self.auto_start.remaining(task))
    }

    /// Arms the automatic start once setup succeeded.
    pub fn setup_complete(&mut self, delay: Duration) {
        self.auto_start.clear();
        self.auto_start_task = Some(self.auto_start.schedule_after(delay, ()));
        info!("setup complete, starting in {:.2}s", delay.as_secs_f32());
    }

    /// Advances the frame-time auto-start timer.
    pub fn poll_auto_start(&mut self, frame_dt: Duration, state: GameState, out: &mut Vec<LevelAction>) {
        if self.auto_start.pending() == 0 {
            return;
        }
        let mut due = Vec::new();
        self.auto_start.advance(frame_dt, &mut due);
        if due.is_empty() {
            return;
        }
        self.auto_start_task = None;
        if state == GameState::Initializing {
            self.begin(out);
        }
    }

    /// Validates a request against `state` and emits the actions fulfilling it.
    pub fn request(
        &mut self,
        request: LevelRequest,
        state: GameState,
        out: &mut Vec<LevelAction>,
    ) -> Result<(), LevelError> {
        match (request, state) {
            (LevelRequest::Start, GameState::Initializing) => {
                self.cancel_auto_start();
                self.begin(out);
            }
            (LevelRequest::TogglePause, GameState::Playing) => {
                out.push(LevelAction::Transition(GameState::Paused));
                out.push(LevelAction::ExportSession);
            }
            (LevelRequest::TogglePause, GameState::Paused) => {
                out.push(LevelAction::Transition(GameState::Playing));
            }
            (
                LevelRequest::Restart,
                GameState::Playing | GameState::Paused | GameState::LevelComplete,
            ) => {
                info!("restarting level");
                self.completed = false;
                self.consecutive_errors = 0;
                out.extend([
                    LevelAction::StopSpawning,
                    LevelAction::ClearBoard,
                    LevelAction::ResetStatistics,
                    LevelAction::StartNewSession,
                ]);
                if state != GameState::Playing {
                    out.push(LevelAction::Transition(GameState::Playing));
                }
                out.push(LevelAction::StartSpawning);
            }
            (LevelRequest::Exit, state) if state != GameState::Exiting => {
                self.cancel_auto_start();
                exit(out);
            }
            (request, state) => {
                warn!("ignoring {request} request while {state:?}");
                return Err(LevelError::InvalidRequest { request, state });
            }
        }
        Ok(())
    }

    /// Observes world events, detecting completion and error cascades.
    pub fn handle(
        &mut self,
        events: &[Event],
        state: GameState,
        all_trials_resolved: bool,
        out: &mut Vec<LevelAction>,
    ) {
        if let Some(expected) = self.recovering.take() {
            if state != expected {
                warn!("recovery left the level {state:?} instead of {expected:?}, forcing exit");
                if state != GameState::Exiting {
                    exit(out);
                }
                return;
            }
            info!("recovery complete");
        }

        for event in events {
            if event.is_rejection() {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
            } else if matches!(
                event,
                Event::BallSpawned { .. } | Event::TrialFinalized { .. }
            ) {
                self.consecutive_errors = 0;
            }
        }

        if state == GameState::Playing && all_trials_resolved && !self.completed {
            self.completed = true;
            info!("all trials resolved, level complete");
            out.extend([
                LevelAction::StopSpawning,
                LevelAction::Transition(GameState::LevelComplete),
                LevelAction::ExportSession,
                LevelAction::PublishSummary,
            ]);
            return;
        }

        // Errors seen while paused or complete wait for play to resume.
        if state == GameState::Playing && self.consecutive_errors >= self.threshold {
            self.recover(out);
        }
    }

    /// Feeds back the outcome of an export action.
    pub fn export_result(&mut self, succeeded: bool) {
        if succeeded {
            self.consecutive_errors = 0;
        } else {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        }
    }

    fn begin(&mut self, out: &mut Vec<LevelAction>) {
        self.completed = false;
        out.push(LevelAction::Transition(GameState::Playing));
        out.push(LevelAction::StartSpawning);
    }

    fn cancel_auto_start(&mut self) {
        self.auto_start.clear();
        self.auto_start_task = None;
    }

    fn recover(&mut self, out: &mut Vec<LevelAction>) {
        warn!(
            "{} consecutive errors, resetting the level",
            self.consecutive_errors
        );
        self.consecutive_errors = 0;
        self.recovering = Some(GameState::Playing);
        out.extend([
            LevelAction::Transition(GameState::Paused),
            LevelAction::StopSpawning,
            LevelAction::ClearBoard,
            LevelAction::ResetStatistics,
            LevelAction::StartNewSession,
            LevelAction::Transition(GameState::Playing),
            LevelAction::StartSpawning,
        ]);
    }
}

fn exit(out: &mut Vec<LevelAction>) {
    out.extend([
        LevelAction::StopSpawning,
        LevelAction::ExportSession,
        LevelAction::Transition(GameState::Exiting),
    ]);
}
