#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Drag coordination for pointer input.
//!
//! The coordinator is the sole arbiter of drag start: it turns the raw
//! pointer stream into hover, grasp, drag and release commands, keeping at
//! most one ball hovered and at most one ball dragged. Input is only acted on
//! while the level is being played.

use glam::Vec3;
use log::debug;
use sorting_board_core::{
    planar_distance, BallId, BallSnapshot, BallView, Command, GameState, InteractionState,
};

/// Pointer input projected onto the board plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Pointer moved to the provided board position.
    Moved(Vec3),
    /// Primary button went down.
    Pressed,
    /// Primary button went up.
    Released,
}

/// Ball under `point`, preferring the nearest and then the lowest identifier.
///
/// Only interactable balls within their own radius of the point are hit.
#[must_use]
pub fn hit_test(balls: &BallView, point: Vec3) -> Option<&BallSnapshot> {
    let mut best: Option<(&BallSnapshot, f32)> = None;
    for ball in balls.iter().filter(|ball| ball.state.is_interactable()) {
        let distance = planar_distance(point, ball.position);
        if distance > ball.size * 0.5 {
            continue;
        }
        let closer = match best {
            None => true,
            Some((current, closest)) => {
                distance < closest || (distance == closest && ball.id < current.id)
            }
        };
        if closer {
            best = Some((ball, distance));
        }
    }
    best.map(|(ball, _)| ball)
}

/// Pure system translating pointer input into interaction commands.
#[derive(Debug, Default)]
pub struct Interaction {
    pointer: Option<Vec3>,
    dragging: Option<BallId>,
    grab_offset: Vec3,
}

impl Interaction {
    /// Creates a coordinator with no pointer observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ball the coordinator is currently dragging.
    #[must_use]
    pub fn dragging(&self) -> Option<BallId> {
        self.dragging
    }

    /// Last pointer position observed on the board.
    #[must_use]
    pub fn pointer(&self) -> Option<Vec3> {
        self.pointer
    }

    /// Forgets any drag in progress.
    pub fn reset(&mut self) {
        self.dragging = None;
        self.grab_offset = Vec3::ZERO;
    }

    /// Consumes pointer input and the active balls to emit interaction commands.
    pub fn handle(
        &mut self,
        pointer: &[PointerEvent],
        state: GameState,
        balls: &BallView,
        out: &mut Vec<Command>,
    ) {
        if let Some(ball) = self.dragging {
            let still_dragged = balls
                .get(ball)
                .is_some_and(|snapshot| snapshot.state == InteractionState::Dragged);
            if !still_dragged {
                debug!("drag of {ball:?} ended by the world");
                self.reset();
            }
        }

        let playing = state == GameState::Playing;
        let mut hovered = balls.hovered();

        for event in pointer {
            match *event {
                PointerEvent::Moved(point) => {
                    self.pointer = Some(point);
                    if !playing {
                        continue;
                    }
                    if let Some(ball) = self.dragging {
                        out.push(Command::DragBall {
                            ball,
                            position: point + self.grab_offset,
                        });
                        continue;
                    }
                    let hit = hit_test(balls, point).map(|ball| ball.id);
                    if hit != hovered {
                        out.push(Command::HoverBall { ball: hit });
                        hovered = hit;
                    }
                }
                PointerEvent::Pressed => {
                    if !playing || self.dragging.is_some() {
                        continue;
                    }
                    let Some(point) = self.pointer else {
                        continue;
                    };
                    if let Some(ball) = hit_test(balls, point) {
                        self.grab_offset = ball.position - point;
                        self.dragging = Some(ball.id);
                        hovered = None;
                        out.push(Command::GraspBall { ball: ball.id });
                    }
                }
                PointerEvent::Released => {
                    if !playing {
                        continue;
                    }
                    let (Some(ball), Some(point)) = (self.dragging, self.pointer) else {
                        continue;
                    };
                    out.push(Command::ReleaseBall {
                        ball,
                        position: point + self.grab_offset,
                    });
                    self.reset();
                }
            }
        }
    }
}
