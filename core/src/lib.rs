#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sorting Board minigame.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

pub mod config;
pub mod observe;
pub mod schedule;
pub mod trial;

use std::{fmt, time::Duration};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use config::{BoardConfig, ConfigError, DisplayConfig, ExportConfig, HoleConfig, LevelConfig};
pub use observe::{Subscribers, Subscription};
pub use schedule::{Due, Scheduler, TaskHandle};
pub use trial::{TrialError, TrialRecord};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Sorting Board.";

/// Closed set of ball and hole colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BallColor {
    /// Red ball or hole.
    Red,
    /// Blue ball or hole.
    Blue,
    /// Yellow ball or hole.
    Yellow,
}

impl BallColor {
    /// Every color in canonical order.
    pub const ALL: [BallColor; 3] = [BallColor::Red, BallColor::Blue, BallColor::Yellow];

    /// Resolves the color stored at the provided canonical index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Red),
            1 => Some(Self::Blue),
            2 => Some(Self::Yellow),
            _ => None,
        }
    }

    /// Name used in exported session files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for BallColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution assigned to a finalized trial.
///
/// `WrongHole` and `Timeout` are part of the persisted vocabulary but are not
/// produced by the current evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Ball landed inside a compatible hole.
    Success,
    /// Ball landed inside a hole of the wrong color or size.
    WrongHole,
    /// Ball was released outside every compatible hole.
    Dropped,
    /// Trial expired before the ball was released.
    Timeout,
}

impl Outcome {
    /// Reports whether the outcome counts as a successful placement.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Name used in exported session files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::WrongHole => "WrongHole",
            Self::Dropped => "Dropped",
            Self::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interaction state tracked for every active ball.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionState {
    /// Ball was just spawned and is still settling onto the board.
    Spawning,
    /// Ball rests on the board and may be picked up.
    Idle,
    /// Pointer is over the ball.
    Hovered,
    /// Ball follows the pointer.
    Dragged,
    /// Ball was placed inside a compatible hole.
    Placed,
    /// Ball was released outside every compatible hole.
    Failed,
}

impl InteractionState {
    /// Reports whether the pointer may pick the ball up.
    #[must_use]
    pub const fn is_interactable(&self) -> bool {
        matches!(self, Self::Idle | Self::Hovered)
    }

    /// Reports whether the trial attached to the ball has been resolved.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Placed | Self::Failed)
    }
}

/// Level-wide game state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Components are being wired and validated.
    Initializing,
    /// Trials are spawning and the game clock runs.
    Playing,
    /// The game clock is frozen.
    Paused,
    /// Every trial of the level has been resolved.
    LevelComplete,
    /// The session is shutting down.
    Exiting,
}

impl GameState {
    /// Reports whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: GameState) -> bool {
        matches!(
            (self, next),
            (Self::Initializing, Self::Playing)
                | (Self::Playing, Self::Paused)
                | (Self::Playing, Self::LevelComplete)
                | (Self::Paused, Self::Playing)
                | (Self::LevelComplete, Self::Playing)
                | (Self::Initializing, Self::Exiting)
                | (Self::Playing, Self::Exiting)
                | (Self::Paused, Self::Exiting)
                | (Self::LevelComplete, Self::Exiting)
        )
    }
}

/// Identifier of a pooled ball entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallId(u32);

impl BallId {
    /// Creates a new ball identifier with the provided pool slot.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the pool slot backing the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a trial, unique within a session and starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialId(u64);

impl TrialId {
    /// First identifier handed out in every session.
    pub const FIRST: TrialId = TrialId(1);

    /// Creates a new trial identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric value backing the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Identifier that follows `self`.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a hole in configuration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoleId(u32);

impl HoleId {
    /// Creates a new hole identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the configuration index backing the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a play session, derived from its local start timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the textual identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Distance between two board points ignoring height.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x, a.z).distance(Vec2::new(b.x, b.z))
}

/// Hole carved into the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    id: HoleId,
    config: HoleConfig,
    center: Vec3,
}

impl Hole {
    /// Creates a hole description.
    #[must_use]
    pub const fn new(id: HoleId, config: HoleConfig, center: Vec3) -> Self {
        Self { id, config, center }
    }

    /// Identifier of the hole in configuration order.
    #[must_use]
    pub const fn id(&self) -> HoleId {
        self.id
    }

    /// Configured color and diameter.
    #[must_use]
    pub const fn config(&self) -> HoleConfig {
        self.config
    }

    /// Color the hole accepts.
    #[must_use]
    pub const fn color(&self) -> BallColor {
        self.config.color
    }

    /// Diameter of the hole in board units.
    #[must_use]
    pub const fn diameter(&self) -> f32 {
        self.config.diameter
    }

    /// Center of the hole on the board surface.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Describes the hole as the receiver of a successful placement.
    #[must_use]
    pub const fn as_target(&self) -> TargetHole {
        TargetHole {
            hole: self.id,
            color: self.config.color,
            diameter: self.config.diameter,
            center: self.center,
        }
    }
}

/// Read-only snapshot of an active ball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BallSnapshot {
    /// Identifier of the ball.
    pub id: BallId,
    /// Trial attached to the ball.
    pub trial: TrialId,
    /// Color of the ball.
    pub color: BallColor,
    /// Diameter of the ball in board units.
    pub size: f32,
    /// Board position of the ball.
    pub position: Vec3,
    /// Interaction state of the ball.
    pub state: InteractionState,
}

/// Collection of active ball snapshots in spawn order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BallView {
    snapshots: Vec<BallSnapshot>,
}

impl BallView {
    /// Creates a view from snapshots captured in spawn order.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<BallSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterates over the captured snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &BallSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no ball is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Finds the snapshot of a specific ball.
    #[must_use]
    pub fn get(&self, ball: BallId) -> Option<&BallSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == ball)
    }

    /// Ball currently marked as hovered, if any.
    #[must_use]
    pub fn hovered(&self) -> Option<BallId> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.state == InteractionState::Hovered)
            .map(|snapshot| snapshot.id)
    }

    /// Consumes the view, returning the captured snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BallSnapshot> {
        self.snapshots
    }
}

/// Hole chosen by the placement evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetHole {
    /// Identifier of the hole.
    pub hole: HoleId,
    /// Color accepted by the hole.
    pub color: BallColor,
    /// Diameter of the hole in board units.
    pub diameter: f32,
    /// Center of the hole on the board.
    pub center: Vec3,
}

/// Result of evaluating a released ball against the board's holes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementVerdict {
    /// Outcome assigned to the trial.
    pub outcome: Outcome,
    /// Planar distance between the release point and the nearest compatible hole.
    pub error: f32,
    /// Hole that received the ball, present only for successful placements.
    pub target: Option<TargetHole>,
}

impl PlacementVerdict {
    /// Verdict for a ball that landed inside `target`.
    #[must_use]
    pub const fn success(target: TargetHole, error: f32) -> Self {
        Self {
            outcome: Outcome::Success,
            error,
            target: Some(target),
        }
    }

    /// Verdict for a ball released outside every compatible hole.
    #[must_use]
    pub const fn dropped(error: f32) -> Self {
        Self {
            outcome: Outcome::Dropped,
            error,
            target: None,
        }
    }

    /// Reports whether the placement succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.outcome.is_success()
    }

    /// Position the ball should snap to, if any.
    #[must_use]
    pub fn snap_position(&self) -> Option<Vec3> {
        self.target.map(|target| target.center)
    }
}

/// Reasons the world may refuse to spawn a ball.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRejection {
    /// Spawning is only permitted while the level is being played.
    NotPlaying,
    /// The level already spawned every configured trial.
    TargetReached,
    /// Every pooled entity is currently in use.
    PoolExhausted,
}

/// Reasons the world may refuse an interaction command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionRejection {
    /// Interaction is only permitted while the level is being played.
    NotPlaying,
    /// The referenced ball is not part of the active trial set.
    UnknownBall,
    /// The ball is not idle or hovered.
    NotInteractable,
    /// Another ball is already being dragged.
    AlreadyDragging,
    /// The ball is not the one being dragged.
    NotDragged,
    /// The ball has no pending release to finalize.
    NotReleased,
    /// The trial record refused the mutation.
    RecordRejected,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the frame clock; game time only advances while playing.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the world transition to the provided game state.
    SetGameState {
        /// State the world should activate.
        state: GameState,
    },
    /// Starts a new session, resetting trial numbering and the spawn count.
    BeginSession {
        /// Identifier of the session that begins.
        session: SessionId,
    },
    /// Requests that a pooled ball be activated for a new trial.
    SpawnBall {
        /// Color assigned to the ball.
        color: BallColor,
        /// Board position the ball appears at.
        position: Vec3,
    },
    /// Moves the single hover marker, clearing it when `ball` is `None`.
    HoverBall {
        /// Ball under the pointer, if any.
        ball: Option<BallId>,
    },
    /// Picks a ball up.
    GraspBall {
        /// Ball being picked up.
        ball: BallId,
    },
    /// Moves the dragged ball.
    DragBall {
        /// Ball being dragged.
        ball: BallId,
        /// New board position of the ball.
        position: Vec3,
    },
    /// Drops the dragged ball at the provided position.
    ReleaseBall {
        /// Ball being released.
        ball: BallId,
        /// Board position where the ball was released.
        position: Vec3,
    },
    /// Resolves the trial of a released ball with the evaluator's verdict.
    FinalizeTrial {
        /// Ball whose trial is finalized.
        ball: BallId,
        /// Verdict produced by the placement evaluator.
        verdict: PlacementVerdict,
    },
    /// Returns a ball to the pool. Returning an inactive ball is a no-op.
    ReturnToPool {
        /// Ball that should be recycled.
        ball: BallId,
    },
    /// Returns every active ball to the pool.
    ClearBoard,
    /// Highlights a hole, clearing the highlight when `hole` is `None`.
    HighlightHole {
        /// Hole that should be highlighted.
        hole: Option<HoleId>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the game clock advanced.
    TimeAdvanced {
        /// Duration of game time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the level entered a new game state.
    GameStateChanged {
        /// State that was active before the transition.
        from: GameState,
        /// State that became active.
        to: GameState,
    },
    /// Reports that a game state transition request was refused.
    TransitionRejected {
        /// State that remained active.
        from: GameState,
        /// State that was requested.
        requested: GameState,
    },
    /// Announces that a new session began.
    SessionStarted {
        /// Identifier of the new session.
        session: SessionId,
    },
    /// Confirms that a ball was activated for a new trial.
    BallSpawned {
        /// Pooled entity assigned to the trial.
        ball: BallId,
        /// Identifier of the new trial.
        trial: TrialId,
        /// Color assigned to the ball.
        color: BallColor,
        /// Diameter of the ball in board units.
        size: f32,
        /// Board position the ball appeared at.
        position: Vec3,
    },
    /// Reports that a spawn request was refused.
    SpawnRejected {
        /// Reason the spawn was refused.
        reason: SpawnRejection,
    },
    /// Confirms that a ball settled onto the board and became interactable.
    BallSettled {
        /// Ball that settled.
        ball: BallId,
    },
    /// Announces that the hover marker moved.
    HoverChanged {
        /// Ball that was hovered before the change.
        previous: Option<BallId>,
        /// Ball that is hovered after the change.
        current: Option<BallId>,
    },
    /// Confirms that a ball was picked up.
    BallGrasped {
        /// Ball that was picked up.
        ball: BallId,
        /// Trial attached to the ball.
        trial: TrialId,
        /// Board position of the ball when it was picked up.
        position: Vec3,
    },
    /// Confirms that the dragged ball moved.
    BallMoved {
        /// Ball that moved.
        ball: BallId,
        /// New board position of the ball.
        position: Vec3,
    },
    /// Confirms that the dragged ball was released and awaits evaluation.
    BallReleased {
        /// Ball that was released.
        ball: BallId,
        /// Trial attached to the ball.
        trial: TrialId,
        /// Color of the ball.
        color: BallColor,
        /// Diameter of the ball in board units.
        size: f32,
        /// Board position where the ball was released.
        position: Vec3,
    },
    /// Broadcasts a finalized, immutable trial record.
    TrialFinalized {
        /// Ball attached to the trial.
        ball: BallId,
        /// Final record of the trial.
        record: TrialRecord,
        /// Board position the ball rests at after finalization.
        position: Vec3,
    },
    /// Reports that an interaction command was refused.
    InteractionRejected {
        /// Ball referenced by the command, if any.
        ball: Option<BallId>,
        /// Reason the interaction was refused.
        reason: InteractionRejection,
    },
    /// Confirms that a ball returned to the pool.
    BallReturned {
        /// Ball that was recycled.
        ball: BallId,
    },
    /// Confirms that every active ball returned to the pool.
    BoardCleared {
        /// Number of balls that were recycled.
        returned: u32,
    },
    /// Announces that the highlighted hole changed.
    HoleHighlightChanged {
        /// Hole that was highlighted before the change.
        previous: Option<HoleId>,
        /// Hole that is highlighted after the change.
        current: Option<HoleId>,
    },
}

impl Event {
    /// Reports whether the event signals a refused request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::TransitionRejected { .. }
                | Self::SpawnRejected { .. }
                | Self::InteractionRejected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_id_round_trips_through_bincode() {
        let id = BallId::new(7);
        let encoded = bincode::serialize(&id).expect("serialize ball id");
        let decoded: BallId = bincode::deserialize(&encoded).expect("deserialize ball id");
        assert_eq!(decoded, id);
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let session = SessionId::new("20240101_120000");
        let json = serde_json::to_string(&session).expect("serialize session id");
        assert_eq!(json, "\"20240101_120000\"");
    }

    #[test]
    fn terminal_states_are_not_interactable() {
        for state in [InteractionState::Placed, InteractionState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.is_interactable());
        }
        assert!(InteractionState::Hovered.is_interactable());
        assert!(!InteractionState::Spawning.is_interactable());
        assert!(!InteractionState::Dragged.is_interactable());
    }

    #[test]
    fn exiting_is_final() {
        for next in [
            GameState::Initializing,
            GameState::Playing,
            GameState::Paused,
            GameState::LevelComplete,
            GameState::Exiting,
        ] {
            assert!(!GameState::Exiting.can_transition_to(next));
        }
    }

    #[test]
    fn level_complete_is_only_reachable_from_playing() {
        assert!(GameState::Playing.can_transition_to(GameState::LevelComplete));
        assert!(!GameState::Paused.can_transition_to(GameState::LevelComplete));
        assert!(!GameState::Initializing.can_transition_to(GameState::LevelComplete));
    }

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 900.0, 0.0);
        let b = Vec3::new(3.0, 0.0, 4.0);
        assert!((planar_distance(a, b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn colors_resolve_from_canonical_index() {
        for (index, color) in BallColor::ALL.iter().enumerate() {
            assert_eq!(BallColor::from_index(index), Some(*color));
        }
        assert_eq!(BallColor::from_index(3), None);
    }
}
