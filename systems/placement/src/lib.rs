#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement evaluation for released balls.
//!
//! [`evaluate`] is a pure function of the board's holes and the ball's state
//! at release, so the verdict never depends on frame timing. The
//! [`Placement`] system wraps it, turning release events into finalization
//! commands and publishing drop hints while a ball is dragged.

use glam::Vec3;
use log::debug;
use sorting_board_core::{
    planar_distance, BallColor, BallView, Command, Event, Hole, HoleId, PlacementVerdict,
};

/// Holes whose color matches and whose diameter fits the ball, in configuration order.
pub fn compatible_holes(
    holes: &[Hole],
    color: BallColor,
    size: f32,
) -> impl Iterator<Item = &Hole> + '_ {
    holes
        .iter()
        .filter(move |hole| hole.config().accepts(color, size))
}

/// Nearest compatible hole and its planar distance. Exact ties keep the earlier hole.
#[must_use]
pub fn nearest_compatible_hole(
    holes: &[Hole],
    color: BallColor,
    size: f32,
    position: Vec3,
) -> Option<(&Hole, f32)> {
    let mut best: Option<(&Hole, f32)> = None;
    for hole in compatible_holes(holes, color, size) {
        let distance = planar_distance(position, hole.center());
        match best {
            Some((_, closest)) if distance >= closest => {}
            _ => best = Some((hole, distance)),
        }
    }
    best
}

/// Decides whether a ball released at `release` landed in a compatible hole.
///
/// The placement is valid when the planar distance to the nearest compatible
/// hole is at most half that hole's diameter. Without any compatible hole the
/// verdict is a drop with zero error.
#[must_use]
pub fn evaluate(holes: &[Hole], color: BallColor, size: f32, release: Vec3) -> PlacementVerdict {
    match nearest_compatible_hole(holes, color, size, release) {
        Some((hole, error)) if error <= hole.diameter() * 0.5 => {
            PlacementVerdict::success(hole.as_target(), error)
        }
        Some((_, error)) => PlacementVerdict::dropped(error),
        None => PlacementVerdict::dropped(0.0),
    }
}

/// Hole worth highlighting while a ball hovers at `position`.
///
/// Only the nearest compatible hole within one diameter of the ball is hinted.
#[must_use]
pub fn drag_hint(holes: &[Hole], color: BallColor, size: f32, position: Vec3) -> Option<HoleId> {
    nearest_compatible_hole(holes, color, size, position)
        .filter(|(hole, distance)| *distance <= hole.diameter())
        .map(|(hole, _)| hole.id())
}

/// Pure system that evaluates released balls.
#[derive(Debug, Default)]
pub struct Placement;

impl Placement {
    /// Creates a new placement system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes world events to emit finalization and highlight commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        holes: &[Hole],
        balls: &BallView,
        out: &mut Vec<Command>,
    ) {
        let mut hint: Option<Option<HoleId>> = None;
        for event in events {
            match event {
                Event::BallMoved { ball, position } => {
                    if let Some(snapshot) = balls.get(*ball) {
                        hint = Some(drag_hint(holes, snapshot.color, snapshot.size, *position));
                    }
                }
                Event::BallReleased {
                    ball,
                    trial,
                    color,
                    size,
                    position,
                } => {
                    let verdict = evaluate(holes, *color, *size, *position);
                    debug!(
                        "trial {trial} released at {position}: {} (error {:.2})",
                        verdict.outcome, verdict.error
                    );
                    out.push(Command::FinalizeTrial {
                        ball: *ball,
                        verdict,
                    });
                    hint = Some(None);
                }
                _ => {}
            }
        }
        if let Some(hole) = hint {
            out.push(Command::HighlightHole { hole });
        }
    }
}
