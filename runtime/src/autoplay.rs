//! Scripted pointer driver for headless runs and end-to-end tests.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sorting_board_core::{BallId, GameState, InteractionState};
use sorting_board_system_interaction::PointerEvent;
use sorting_board_system_placement::nearest_compatible_hole;
use sorting_board_world::{query, World};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Plan {
    Seeking,
    Carrying {
        ball: BallId,
        from: Vec3,
        to: Vec3,
        step: u32,
    },
}

/// Picks up settled balls one at a time and carries them to a hole.
///
/// A configurable share of carries deliberately misses the hole so
/// failures show up in the statistics.
#[derive(Debug)]
pub struct AutoPlayer {
    rng: ChaCha8Rng,
    miss_rate: f64,
    carry_steps: u32,
    plan: Plan,
}

impl AutoPlayer {
    /// Creates a driver that misses with probability `miss_rate`.
    #[must_use]
    pub fn new(seed: u64, miss_rate: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            miss_rate: miss_rate.clamp(0.0, 1.0),
            carry_steps: 20,
            plan: Plan::Seeking,
        }
    }

    /// Sets the number of frames spent carrying each ball.
    #[must_use]
    pub fn with_carry_steps(mut self, steps: u32) -> Self {
        self.carry_steps = steps.max(1);
        self
    }

    /// Produces the pointer input for the next frame.
    pub fn drive(&mut self, world: &World) -> Vec<PointerEvent> {
        if query::game_state(world) != GameState::Playing {
            return Vec::new();
        }
        let dragged = query::dragged(world);
        match self.plan {
            Plan::Seeking if dragged.is_some() => vec![PointerEvent::Released],
            Plan::Seeking => self.pick_up(world),
            Plan::Carrying {
                ball,
                from,
                to,
                step,
            } => {
                if dragged != Some(ball) {
                    self.plan = Plan::Seeking;
                    return Vec::new();
                }
                let step = step + 1;
                if step >= self.carry_steps {
                    self.plan = Plan::Seeking;
                    return vec![PointerEvent::Moved(to), PointerEvent::Released];
                }
                self.plan = Plan::Carrying {
                    ball,
                    from,
                    to,
                    step,
                };
                let progress = step as f32 / self.carry_steps as f32;
                vec![PointerEvent::Moved(from.lerp(to, progress))]
            }
        }
    }

    fn pick_up(&mut self, world: &World) -> Vec<PointerEvent> {
        let view = query::ball_view(world);
        let Some(ball) = view
            .iter()
            .filter(|ball| {
                matches!(
                    ball.state,
                    InteractionState::Idle | InteractionState::Hovered
                )
            })
            .min_by_key(|ball| ball.id)
        else {
            return Vec::new();
        };

        let target = match nearest_compatible_hole(
            query::holes(world),
            ball.color,
            ball.size,
            ball.position,
        ) {
            Some((hole, _)) if self.rng.gen_bool(self.miss_rate) => {
                hole.center() + Vec3::new(hole.diameter(), 0.0, 0.0)
            }
            Some((hole, _)) => hole.center(),
            None => Vec3::new(0.0, ball.position.y, 0.0),
        };

        self.plan = Plan::Carrying {
            ball: ball.id,
            from: ball.position,
            to: target,
            step: 0,
        };
        vec![PointerEvent::Moved(ball.position), PointerEvent::Pressed]
    }
}
