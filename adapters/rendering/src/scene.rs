use std::time::Duration;

use glam::Vec3;
use sorting_board_core::{BallColor, BallId, GameState, Hole, HoleId, InteractionState};

use crate::{BoardRenderer, Color};

/// Planar extent of the board and its colors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardPresentation {
    /// Extent along x, centered on the origin.
    pub width: f32,
    /// Extent along z, centered on the origin.
    pub depth: f32,
    /// Height of the board surface.
    pub height: f32,
    /// Fill color of the board surface.
    pub surface_color: Color,
}

impl BoardPresentation {
    /// Creates a board descriptor.
    #[must_use]
    pub const fn new(width: f32, depth: f32, height: f32, surface_color: Color) -> Self {
        Self {
            width,
            depth,
            height,
            surface_color,
        }
    }

    /// Clamps a position onto the board surface.
    #[must_use]
    pub fn clamp_to_board(&self, position: Vec3) -> Vec3 {
        let half_width = self.width * 0.5;
        let half_depth = self.depth * 0.5;
        Vec3::new(
            position.x.clamp(-half_width, half_width),
            self.height,
            position.z.clamp(-half_depth, half_depth),
        )
    }
}

/// Hole drawn on the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneHole {
    /// Identifier of the hole.
    pub id: HoleId,
    /// Color accepted by the hole.
    pub color: BallColor,
    /// Diameter in board units.
    pub diameter: f32,
    /// Center on the board.
    pub center: Vec3,
    /// Whether the hole is currently hinted as a drop target.
    pub highlighted: bool,
}

/// Ball drawn on the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBall {
    /// Identifier of the ball.
    pub id: BallId,
    /// Color of the ball.
    pub color: BallColor,
    /// Interaction state used to pick the ball's appearance.
    pub state: InteractionState,
    /// Current position on the board.
    pub position: Vec3,
    /// Residual motion from the last impulse.
    pub velocity: Vec3,
}

/// Values displayed by the heads-up display.
#[derive(Clone, Debug, PartialEq)]
pub struct HudView {
    /// State of the level.
    pub state: GameState,
    /// Share of successful trials as a percentage.
    pub accuracy: f64,
    /// Mean placement error in board units.
    pub mean_error: f64,
    /// Mean completion time in seconds.
    pub mean_seconds: f64,
    /// Trials per minute of play.
    pub throughput: f64,
    /// Finalized trials.
    pub completed: u32,
    /// Successful trials.
    pub successes: u32,
    /// Trials planned for the level.
    pub total_trials: u32,
    /// Identifier of the current session.
    pub session: String,
}

impl Default for HudView {
    fn default() -> Self {
        Self {
            state: GameState::Initializing,
            accuracy: 0.0,
            mean_error: 0.0,
            mean_seconds: 0.0,
            throughput: 0.0,
            completed: 0,
            successes: 0,
            total_trials: 0,
            session: String::new(),
        }
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Board the balls sit on.
    pub board: BoardPresentation,
    /// Holes in configuration order.
    pub holes: Vec<SceneHole>,
    /// Balls currently visible, in spawn order.
    pub balls: Vec<SceneBall>,
    /// Diameter of every ball.
    pub ball_diameter: f32,
    /// Heads-up display contents.
    pub hud: HudView,
    /// Greeting shown before play starts.
    pub banner: String,
    /// Whether the adapter should show its frame-rate counter.
    pub show_fps: bool,
}

/// Fraction of ball velocity kept per second.
const VELOCITY_RETENTION: f32 = 0.05;

impl Scene {
    /// Creates a scene for the provided board and holes with no balls.
    #[must_use]
    pub fn new(
        board: BoardPresentation,
        holes: &[Hole],
        ball_diameter: f32,
        banner: impl Into<String>,
    ) -> Self {
        let holes = holes
            .iter()
            .map(|hole| SceneHole {
                id: hole.id(),
                color: hole.color(),
                diameter: hole.diameter(),
                center: hole.center(),
                highlighted: false,
            })
            .collect();
        Self {
            board,
            holes,
            balls: Vec::new(),
            ball_diameter,
            hud: HudView::default(),
            banner: banner.into(),
            show_fps: false,
        }
    }

    /// Looks up a visible ball.
    #[must_use]
    pub fn ball(&self, ball: BallId) -> Option<&SceneBall> {
        self.balls.iter().find(|candidate| candidate.id == ball)
    }

    /// Integrates residual impulse motion, keeping balls on the board.
    pub fn animate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 {
            return;
        }
        let retention = VELOCITY_RETENTION.powf(seconds);
        let board = self.board;
        for ball in &mut self.balls {
            if ball.velocity == Vec3::ZERO {
                continue;
            }
            ball.position = board.clamp_to_board(ball.position + ball.velocity * seconds);
            ball.velocity *= retention;
            if ball.velocity.length_squared() < 1.0 {
                ball.velocity = Vec3::ZERO;
            }
        }
    }

    fn ball_mut(&mut self, ball: BallId) -> Option<&mut SceneBall> {
        self.balls.iter_mut().find(|candidate| candidate.id == ball)
    }
}

impl BoardRenderer for Scene {
    fn set_position(&mut self, ball: BallId, position: Vec3) {
        if let Some(entry) = self.ball_mut(ball) {
            entry.position = position;
            entry.velocity = Vec3::ZERO;
        }
    }

    fn apply_impulse(&mut self, ball: BallId, impulse: Vec3) {
        if let Some(entry) = self.ball_mut(ball) {
            entry.velocity += impulse;
        }
    }

    fn set_visual_state(&mut self, ball: BallId, state: InteractionState, color: BallColor) {
        if let Some(entry) = self.ball_mut(ball) {
            entry.state = state;
            entry.color = color;
            return;
        }
        self.balls.push(SceneBall {
            id: ball,
            color,
            state,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
        });
    }

    fn remove_ball(&mut self, ball: BallId) {
        self.balls.retain(|entry| entry.id != ball);
    }

    fn set_hole_highlight(&mut self, hole: HoleId, highlighted: bool) {
        if let Some(entry) = self.holes.iter_mut().find(|entry| entry.id == hole) {
            entry.highlighted = highlighted;
        }
    }
}
