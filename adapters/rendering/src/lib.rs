#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Sorting Board adapters.
//!
//! The game core never draws anything itself. It talks to the board through
//! [`BoardRenderer`] and to the speakers through [`AudioCues`]; the
//! [`Presenter`] translates world events into calls on both. Backends
//! implement [`RenderingBackend`] and drive the frame loop.

mod presenter;
mod scene;

use anyhow::Result as AnyResult;
use glam::Vec3;
use sorting_board_core::{BallColor, BallId, HoleId, InteractionState};
use std::time::Duration;

pub use crate::{
    presenter::Presenter,
    scene::{BoardPresentation, HudView, Scene, SceneBall, SceneHole},
};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Base color used to draw balls and holes of the provided color.
#[must_use]
pub const fn palette(color: BallColor) -> Color {
    match color {
        BallColor::Red => Color::from_rgb_u8(220, 60, 60),
        BallColor::Blue => Color::from_rgb_u8(60, 110, 220),
        BallColor::Yellow => Color::from_rgb_u8(235, 200, 50),
    }
}

/// Visual and physical hooks for balls and holes on the board.
pub trait BoardRenderer {
    /// Moves a ball to a board position.
    fn set_position(&mut self, ball: BallId, position: Vec3);

    /// Pushes a ball with the provided impulse.
    fn apply_impulse(&mut self, ball: BallId, impulse: Vec3);

    /// Updates the appearance of a ball for its interaction state.
    fn set_visual_state(&mut self, ball: BallId, state: InteractionState, color: BallColor);

    /// Hides a ball that went back to the pool.
    fn remove_ball(&mut self, ball: BallId);

    /// Toggles the highlight of a hole.
    fn set_hole_highlight(&mut self, hole: HoleId, highlighted: bool);
}

/// Fire-and-forget audio feedback.
pub trait AudioCues {
    /// Cue played when a ball lands in its hole.
    fn play_success_cue(&mut self, position: Vec3);

    /// Cue played when a ball is dropped outside every compatible hole.
    fn play_failure_cue(&mut self, position: Vec3);

    /// Rolling sound for a dragged ball, `intensity` in `0.0..=1.0`.
    fn play_roll_cue(&mut self, position: Vec3, intensity: f32);
}

/// Renderer that ignores every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl BoardRenderer for NullRenderer {
    fn set_position(&mut self, _ball: BallId, _position: Vec3) {}

    fn apply_impulse(&mut self, _ball: BallId, _impulse: Vec3) {}

    fn set_visual_state(&mut self, _ball: BallId, _state: InteractionState, _color: BallColor) {}

    fn remove_ball(&mut self, _ball: BallId) {}

    fn set_hole_highlight(&mut self, _hole: HoleId, _highlighted: bool) {}
}

/// Audio sink that plays nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

impl AudioCues for SilentAudio {
    fn play_success_cue(&mut self, _position: Vec3) {}

    fn play_failure_cue(&mut self, _position: Vec3) {}

    fn play_roll_cue(&mut self, _position: Vec3, _intensity: f32) {}
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Cursor position projected onto the board plane, if over the board.
    pub pointer: Option<Vec3>,
    /// Primary button went down this frame.
    pub pressed: bool,
    /// Primary button went up this frame.
    pub released: bool,
    /// Pause or resume was requested this frame.
    pub toggle_pause: bool,
    /// A restart was requested this frame.
    pub restart: bool,
    /// Exit was requested this frame.
    pub exit: bool,
}

/// Decision returned by the per-frame update closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Keep presenting frames.
    Continue,
    /// Close the window and return from [`RenderingBackend::run`].
    Exit,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Sorting Board scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the update closure asks to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// input captured by the adapter, and mutates the scene before it is
    /// rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static;
}
