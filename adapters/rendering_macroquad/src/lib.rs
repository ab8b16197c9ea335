#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Sorting Board.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment, so
//! the crate depends on macroquad without its default `audio` feature.
//!
//! The board is drawn top-down: board `x` maps to screen `x` and board `z`
//! maps to screen `y`. All `macroquad::ui` calls live in the local `ui`
//! module.

mod ui;

use self::ui::{draw_hud_ui, HudUiContext};
use anyhow::Result;
use glam::{Vec2, Vec3};
use macroquad::input::{
    is_key_pressed, is_mouse_button_pressed, is_mouse_button_released, mouse_position, KeyCode,
    MouseButton,
};
use macroquad::math::Vec2 as MacroquadVec2;
use sorting_board_core::InteractionState;
use sorting_board_rendering::{
    palette, Color, FrameControl, FrameInput, Presentation, RenderingBackend, Scene, SceneBall,
    SceneHole,
};
use std::time::Duration;

/// Width of the heads-up display strip on the right of the window.
const HUD_WIDTH: f32 = 280.0;

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct KeyboardShortcuts {
    /// `P` or `Space` toggles the pause state.
    toggle_pause: bool,
    /// `R` restarts the level.
    restart: bool,
    /// `Q` or `Escape` ends the session.
    exit: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            toggle_pause: is_key_pressed(KeyCode::P) || is_key_pressed(KeyCode::Space),
            restart: is_key_pressed(KeyCode::R),
            exit: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
        }
    }
}

/// Mouse button edges observed during a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct MouseButtons {
    pressed: bool,
    released: bool,
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    window_width: i32,
    window_height: i32,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Requests an initial window size in pixels.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = i32::try_from(width).unwrap_or(i32::MAX);
        self.window_height = i32::try_from(height).unwrap_or(i32::MAX);
        self
    }
}

/// Average frames per second over the last full second.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    last: Option<f32>,
}

impl FpsCounter {
    /// Records a rendered frame and returns the latest per-second average.
    fn record_frame(&mut self, frame: Duration) -> Option<f32> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        if self.elapsed >= Duration::from_secs(1) {
            let seconds = self.elapsed.as_secs_f32();
            self.last = Some(self.frames as f32 / seconds);
            self.elapsed = Duration::ZERO;
            self.frames = 0;
        }
        self.last
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static,
    {
        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: self.window_width,
            window_height: self.window_height,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = self.swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                let buttons = MouseButtons {
                    pressed: is_mouse_button_pressed(MouseButton::Left),
                    released: is_mouse_button_released(MouseButton::Left),
                };

                macroquad::window::clear_background(background);

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let metrics_before = BoardMetrics::from_scene(&scene, screen_width, screen_height);
                let (cursor_x, cursor_y) = mouse_position();
                let frame_input = gather_frame_input_from_observations(
                    &metrics_before,
                    Vec2::new(cursor_x, cursor_y),
                    buttons,
                    keyboard,
                );

                if update_scene(frame_dt, frame_input, &mut scene) == FrameControl::Exit {
                    break;
                }

                let metrics = BoardMetrics::from_scene(&scene, screen_width, screen_height);
                draw_board(&scene, &metrics);
                draw_holes(&scene.holes, &metrics);
                draw_balls(&scene.balls, scene.ball_diameter, &metrics);

                let fps = fps_counter.record_frame(frame_dt);
                let mut hud_ui = macroquad::ui::root_ui();
                draw_hud_ui(
                    &mut hud_ui,
                    HudUiContext {
                        origin: MacroquadVec2::new((screen_width - HUD_WIDTH).max(0.0), 0.0),
                        size: MacroquadVec2::new(HUD_WIDTH.min(screen_width), screen_height),
                        background: to_macroquad_color(clear_color.lighten(0.1)),
                        hud: &scene.hud,
                        banner: scene.banner.as_str(),
                        fps: fps.filter(|_| scene.show_fps),
                    },
                );

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Mapping between board units and screen pixels for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct BoardMetrics {
    scale: f32,
    origin: Vec2,
    half_width: f32,
    half_depth: f32,
    height: f32,
}

impl BoardMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        let board = scene.board;
        let available_width = (screen_width - HUD_WIDTH).max(0.0);
        let scale = if board.width <= f32::EPSILON || board.depth <= f32::EPSILON {
            0.0
        } else {
            (available_width / board.width).min(screen_height / board.depth)
        };
        Self {
            scale,
            origin: Vec2::new(available_width * 0.5, screen_height * 0.5),
            half_width: board.width * 0.5,
            half_depth: board.depth * 0.5,
            height: board.height,
        }
    }

    fn to_screen(&self, position: Vec3) -> Vec2 {
        self.origin + Vec2::new(position.x, position.z) * self.scale
    }

    /// Projects a cursor onto the board plane. Cursors off the board map to `None`.
    fn to_board(&self, cursor: Vec2) -> Option<Vec3> {
        if self.scale <= f32::EPSILON {
            return None;
        }
        let planar = (cursor - self.origin) / self.scale;
        let inside = planar.x.abs() <= self.half_width && planar.y.abs() <= self.half_depth;
        inside.then(|| Vec3::new(planar.x, self.height, planar.y))
    }
}

fn gather_frame_input_from_observations(
    metrics: &BoardMetrics,
    cursor_position: Vec2,
    buttons: MouseButtons,
    keyboard: KeyboardShortcuts,
) -> FrameInput {
    let pointer = metrics.to_board(cursor_position);
    FrameInput {
        pointer,
        pressed: buttons.pressed && pointer.is_some(),
        released: buttons.released,
        toggle_pause: keyboard.toggle_pause,
        restart: keyboard.restart,
        exit: keyboard.exit,
    }
}

fn draw_board(scene: &Scene, metrics: &BoardMetrics) {
    let top_left = metrics.to_screen(Vec3::new(-metrics.half_width, 0.0, -metrics.half_depth));
    let size = Vec2::new(scene.board.width, scene.board.depth) * metrics.scale;
    macroquad::shapes::draw_rectangle(
        top_left.x,
        top_left.y,
        size.x,
        size.y,
        to_macroquad_color(scene.board.surface_color),
    );
}

fn draw_holes(holes: &[SceneHole], metrics: &BoardMetrics) {
    let rim = to_macroquad_color(Color::from_rgb_u8(20, 20, 20));
    for hole in holes {
        let center = metrics.to_screen(hole.center);
        let radius = hole.diameter * 0.5 * metrics.scale;
        let fill = palette(hole.color).with_alpha(0.35);
        macroquad::shapes::draw_circle(center.x, center.y, radius, to_macroquad_color(fill));
        let (thickness, outline) = if hole.highlighted {
            (4.0, palette(hole.color).lighten(0.5))
        } else {
            (2.0, palette(hole.color))
        };
        macroquad::shapes::draw_circle_lines(
            center.x,
            center.y,
            radius,
            thickness,
            to_macroquad_color(outline),
        );
        macroquad::shapes::draw_circle_lines(center.x, center.y, radius + thickness, 1.0, rim);
    }
}

fn draw_balls(balls: &[SceneBall], diameter: f32, metrics: &BoardMetrics) {
    // Dragged balls draw last so they stay on top.
    let resting = balls
        .iter()
        .filter(|ball| ball.state != InteractionState::Dragged);
    let dragged = balls
        .iter()
        .filter(|ball| ball.state == InteractionState::Dragged);
    for ball in resting.chain(dragged) {
        let center = metrics.to_screen(ball.position);
        let (radius_scale, fill) = ball_appearance(ball);
        let radius = diameter * 0.5 * radius_scale * metrics.scale;
        macroquad::shapes::draw_circle(center.x, center.y, radius, to_macroquad_color(fill));
        if matches!(
            ball.state,
            InteractionState::Hovered | InteractionState::Dragged
        ) {
            macroquad::shapes::draw_circle_lines(
                center.x,
                center.y,
                radius,
                3.0,
                macroquad::color::WHITE,
            );
        }
    }
}

/// Radius multiplier and fill color for a ball in its current state.
fn ball_appearance(ball: &SceneBall) -> (f32, Color) {
    let base = palette(ball.color);
    match ball.state {
        InteractionState::Spawning => (1.0, base.with_alpha(0.5)),
        InteractionState::Idle => (1.0, base),
        InteractionState::Hovered => (1.0, base.lighten(0.25)),
        InteractionState::Dragged => (1.15, base.lighten(0.35)),
        InteractionState::Placed => (0.9, base.with_alpha(0.85)),
        InteractionState::Failed => (1.0, base.with_alpha(0.4)),
    }
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorting_board_core::{BallColor, BallId};
    use sorting_board_rendering::BoardPresentation;

    fn scene() -> Scene {
        Scene::new(
            BoardPresentation::new(800.0, 600.0, 900.0, Color::from_rgb_u8(40, 40, 40)),
            &[],
            120.0,
            "welcome",
        )
    }

    #[test]
    fn board_fits_the_area_left_of_the_hud() {
        let metrics = BoardMetrics::from_scene(&scene(), 800.0 + HUD_WIDTH, 1200.0);
        assert!((metrics.scale - 1.0).abs() < 1e-6);
        assert_eq!(metrics.origin, Vec2::new(400.0, 600.0));
    }

    #[test]
    fn cursor_maps_onto_the_board_plane() {
        let metrics = BoardMetrics::from_scene(&scene(), 800.0 + HUD_WIDTH, 600.0);
        let pointer = metrics.to_board(Vec2::new(500.0, 250.0));
        assert_eq!(pointer, Some(Vec3::new(100.0, 900.0, -50.0)));

        let back = metrics.to_screen(Vec3::new(100.0, 900.0, -50.0));
        assert_eq!(back, Vec2::new(500.0, 250.0));
    }

    #[test]
    fn cursor_off_the_board_has_no_pointer() {
        let metrics = BoardMetrics::from_scene(&scene(), 800.0 + HUD_WIDTH, 600.0);
        assert_eq!(metrics.to_board(Vec2::new(900.0, 300.0)), None);
    }

    #[test]
    fn press_off_the_board_is_ignored_but_release_is_kept() {
        let scene = scene();
        let metrics = BoardMetrics::from_scene(&scene, 800.0 + HUD_WIDTH, 600.0);
        let input = gather_frame_input_from_observations(
            &metrics,
            Vec2::new(1000.0, 300.0),
            MouseButtons {
                pressed: true,
                released: true,
            },
            KeyboardShortcuts {
                restart: true,
                ..KeyboardShortcuts::default()
            },
        );
        assert_eq!(input.pointer, None);
        assert!(!input.pressed);
        assert!(input.released, "a drag must be able to end off the board");
        assert!(input.restart);
    }

    #[test]
    fn dragged_balls_are_drawn_larger() {
        let mut ball = SceneBall {
            id: BallId::new(0),
            color: BallColor::Blue,
            state: InteractionState::Idle,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
        };
        let (idle_scale, _) = ball_appearance(&ball);
        ball.state = InteractionState::Dragged;
        let (dragged_scale, _) = ball_appearance(&ball);
        assert!(dragged_scale > idle_scale);
    }

    #[test]
    fn fps_counter_reports_after_one_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..59 {
            assert_eq!(counter.record_frame(Duration::from_millis(16)), None);
        }
        let fps = counter
            .record_frame(Duration::from_millis(100))
            .expect("a second has elapsed");
        assert!((fps - 60.0 / 1.044).abs() < 0.01);
    }
}
