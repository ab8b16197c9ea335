use std::collections::HashMap;

use glam::Vec3;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sorting_board_core::{BallColor, BallId, Event, InteractionState};

use crate::{AudioCues, BoardRenderer};

/// Speed of the bounce given to dropped balls, in board units per second.
const BOUNCE_SPEED: f32 = 300.0;

/// Drag distance per event that plays the roll cue at full intensity.
const ROLL_REFERENCE: f32 = 60.0;

/// Quietest roll cue worth playing.
const ROLL_THRESHOLD: f32 = 0.05;

#[derive(Clone, Copy, Debug)]
struct Tracked {
    color: BallColor,
    position: Vec3,
}

/// Translates world events into renderer and audio calls.
#[derive(Debug)]
pub struct Presenter {
    rng: ChaCha8Rng,
    balls: HashMap<BallId, Tracked>,
}

impl Presenter {
    /// Creates a presenter whose bounce directions derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            balls: HashMap::new(),
        }
    }

    /// Presents every event of a tick, in order.
    pub fn present<R, A>(&mut self, events: &[Event], renderer: &mut R, audio: &mut A)
    where
        R: BoardRenderer + ?Sized,
        A: AudioCues + ?Sized,
    {
        for event in events {
            self.present_event(event, renderer, audio);
        }
    }

    fn present_event<R, A>(&mut self, event: &Event, renderer: &mut R, audio: &mut A)
    where
        R: BoardRenderer + ?Sized,
        A: AudioCues + ?Sized,
    {
        match event {
            Event::BallSpawned {
                ball,
                color,
                position,
                ..
            } => {
                let _ = self.balls.insert(
                    *ball,
                    Tracked {
                        color: *color,
                        position: *position,
                    },
                );
                renderer.set_visual_state(*ball, InteractionState::Spawning, *color);
                renderer.set_position(*ball, *position);
            }
            Event::BallSettled { ball } => self.restyle(*ball, InteractionState::Idle, renderer),
            Event::HoverChanged { previous, current } => {
                if let Some(previous) = previous {
                    self.restyle(*previous, InteractionState::Idle, renderer);
                }
                if let Some(current) = current {
                    self.restyle(*current, InteractionState::Hovered, renderer);
                }
            }
            Event::BallGrasped { ball, .. } => {
                self.restyle(*ball, InteractionState::Dragged, renderer);
            }
            Event::BallMoved { ball, position } => {
                renderer.set_position(*ball, *position);
                if let Some(tracked) = self.balls.get_mut(ball) {
                    let travelled = tracked.position.distance(*position);
                    tracked.position = *position;
                    let intensity = (travelled / ROLL_REFERENCE).min(1.0);
                    if intensity >= ROLL_THRESHOLD {
                        audio.play_roll_cue(*position, intensity);
                    }
                }
            }
            Event::BallReleased { ball, position, .. } => {
                renderer.set_position(*ball, *position);
                self.track_position(*ball, *position);
            }
            Event::TrialFinalized {
                ball,
                record,
                position,
            } => {
                let success = record.outcome().is_some_and(|outcome| outcome.is_success());
                renderer.set_position(*ball, *position);
                self.track_position(*ball, *position);
                if success {
                    self.restyle(*ball, InteractionState::Placed, renderer);
                    audio.play_success_cue(*position);
                } else {
                    self.restyle(*ball, InteractionState::Failed, renderer);
                    let impulse = self.bounce();
                    trace!("bouncing {ball:?} with {impulse}");
                    renderer.apply_impulse(*ball, impulse);
                    audio.play_failure_cue(*position);
                }
            }
            Event::BallReturned { ball } => {
                let _ = self.balls.remove(ball);
                renderer.remove_ball(*ball);
            }
            Event::HoleHighlightChanged { previous, current } => {
                if let Some(previous) = previous {
                    renderer.set_hole_highlight(*previous, false);
                }
                if let Some(current) = current {
                    renderer.set_hole_highlight(*current, true);
                }
            }
            _ => {}
        }
    }

    fn restyle<R>(&self, ball: BallId, state: InteractionState, renderer: &mut R)
    where
        R: BoardRenderer + ?Sized,
    {
        if let Some(tracked) = self.balls.get(&ball) {
            renderer.set_visual_state(ball, state, tracked.color);
        }
    }

    fn track_position(&mut self, ball: BallId, position: Vec3) {
        if let Some(tracked) = self.balls.get_mut(&ball) {
            tracked.position = position;
        }
    }

    /// Upward impulse tilted by a random offset inside a half-unit sphere.
    fn bounce(&mut self) -> Vec3 {
        let offset = loop {
            let candidate = Vec3::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            );
            if candidate.length_squared() <= 1.0 {
                break candidate;
            }
        };
        (Vec3::Y + offset * 0.5) * BOUNCE_SPEED
    }
}
