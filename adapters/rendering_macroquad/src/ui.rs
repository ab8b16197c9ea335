//! Immediate-mode UI helpers for the Macroquad rendering backend.
//!
//! This module hosts all uses of `macroquad::ui` so the rest of the adapter can
//! remain agnostic of Macroquad's UI types.

use macroquad::{
    color::{Color, WHITE},
    math::{RectOffset, Vec2},
    ui::{hash, Ui},
};
use sorting_board_core::GameState;
use sorting_board_rendering::HudView;

/// Snapshot of the HUD's layout and data for the current frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HudUiContext<'a> {
    /// Top-left corner of the panel in screen coordinates.
    pub origin: Vec2,
    /// Panel dimensions in screen space.
    pub size: Vec2,
    /// Background colour applied to the window skin.
    pub background: Color,
    /// Live statistics and level state.
    pub hud: &'a HudView,
    /// Greeting shown until play starts.
    pub banner: &'a str,
    /// Frames per second, when the counter is enabled.
    pub fps: Option<f32>,
}

fn state_label(state: GameState) -> &'static str {
    match state {
        GameState::Initializing => "Get ready",
        GameState::Playing => "Playing",
        GameState::Paused => "Paused",
        GameState::LevelComplete => "Level complete",
        GameState::Exiting => "Exiting",
    }
}

/// Lines of text shown in the HUD, top to bottom.
fn hud_lines(context: &HudUiContext<'_>) -> Vec<String> {
    let hud = context.hud;
    let mut lines = Vec::new();
    if hud.state == GameState::Initializing && !context.banner.is_empty() {
        lines.push(context.banner.to_owned());
    }
    lines.push(state_label(hud.state).to_owned());
    lines.push(format!("Trials: {}/{}", hud.completed, hud.total_trials));
    lines.push(format!("Successes: {}", hud.successes));
    lines.push(format!("Accuracy: {:.1}%", hud.accuracy));
    lines.push(format!("Mean error: {:.1}", hud.mean_error));
    lines.push(format!("Mean time: {:.2}s", hud.mean_seconds));
    lines.push(format!("Throughput: {:.1}/min", hud.throughput));
    lines.push(format!("Session: {}", hud.session));
    if let Some(fps) = context.fps {
        lines.push(format!("FPS: {fps:.1}"));
    }
    lines.push("P pause, R restart, Q quit".to_owned());
    lines
}

/// Renders the heads-up display for the current frame.
pub(crate) fn draw_hud_ui(ui: &mut Ui, context: HudUiContext<'_>) {
    let mut skin = ui.default_skin();
    skin.margin = 0.0;

    let window_style = ui
        .style_builder()
        .color(context.background)
        .color_hovered(context.background)
        .color_clicked(context.background)
        .color_selected(context.background)
        .color_selected_hovered(context.background)
        .color_inactive(context.background)
        .text_color(WHITE)
        .margin(RectOffset::new(16.0, 16.0, 16.0, 16.0))
        .build();
    skin.window_style = window_style;

    let label_style = ui
        .style_builder()
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .margin(RectOffset::new(0.0, 0.0, 4.0, 4.0))
        .build();
    skin.label_style = label_style;

    ui.push_skin(&skin);

    let lines = hud_lines(&context);
    let _ = ui.window(hash!("hud"), context.origin, context.size, |ui| {
        for line in &lines {
            ui.label(None, line.as_str());
        }
    });

    ui.pop_skin();
}
