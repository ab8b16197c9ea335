#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting ball spawn commands.
//!
//! The spawner keeps its cadence on a private [`Scheduler`] that only advances
//! when the world reports [`Event::TimeAdvanced`], so pausing the level
//! freezes the remaining wait.

use std::time::Duration;

use glam::Vec3;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sorting_board_core::{BallColor, BoardConfig, Command, Event, LevelConfig, Scheduler, TaskHandle};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    spawn_interval: Duration,
    rng_seed: u64,
    board: BoardConfig,
    ball_radius: f32,
}

impl Config {
    /// Creates a new configuration using the provided spawn cadence and seed.
    #[must_use]
    pub fn new(spawn_interval: Duration, rng_seed: u64) -> Self {
        let level = LevelConfig::default();
        Self {
            spawn_interval,
            rng_seed,
            board: level.board,
            ball_radius: level.ball_radius(),
        }
    }

    /// Derives the spawner configuration from the level description.
    #[must_use]
    pub fn from_level(level: &LevelConfig, rng_seed: u64) -> Self {
        Self {
            spawn_interval: level.spawn_interval(),
            rng_seed,
            board: level.board,
            ball_radius: level.ball_radius(),
        }
    }
}

/// Spawn progress of the running session, as reported by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnProgress {
    /// Trials the world already spawned.
    pub spawned: u32,
    /// Trials the level spawns in total.
    pub target: u32,
}

impl SpawnProgress {
    fn remaining(&self) -> u32 {
        self.target.saturating_sub(self.spawned)
    }
}

/// Pure system that emits spawn commands at a fixed game-time cadence.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    clock: Scheduler<()>,
    pending: Option<TaskHandle>,
}

impl Spawning {
    /// Creates a new, stopped spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            clock: Scheduler::new(),
            pending: None,
        }
    }

    /// Reports whether a spawn is scheduled.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.pending.is_some()
    }

    /// Game time left before the next spawn, if one is scheduled.
    #[must_use]
    pub fn time_until_next_spawn(&self) -> Option<Duration> {
        self.pending
            .and_then(|handle| self.clock.remaining(handle))
    }

    /// Begins spawning; the first ball appears on the next tick.
    pub fn start(&mut self) {
        if self.pending.is_some() {
            debug!("spawner already running");
            return;
        }
        let now = self.clock.now();
        self.pending = Some(self.clock.schedule_at(now, ()));
        info!(
            "spawning started (interval {:.2}s)",
            self.config.spawn_interval.as_secs_f32()
        );
    }

    /// Cancels the pending spawn. Active trials are unaffected.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = self.clock.cancel(handle);
            info!("spawning stopped");
        }
    }

    /// Stops spawning and re-seeds the color and position generator.
    pub fn reset(&mut self) {
        self.stop();
        self.clock.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
    }

    /// Consumes events and the world's spawn progress to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], progress: SpawnProgress, out: &mut Vec<Command>) {
        if self.pending.is_none() {
            return;
        }

        let mut tick_observed = false;
        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                tick_observed = true;
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if !tick_observed {
            return;
        }

        let mut due = Vec::new();
        self.clock.advance(accumulated, &mut due);

        let mut emitted = 0;
        let mut index = 0;
        while index < due.len() {
            let at = due[index].at;
            index += 1;
            self.pending = None;

            let remaining = progress.remaining().saturating_sub(emitted);
            if remaining == 0 {
                info!("finished spawning all {} balls", progress.target);
                break;
            }

            let batch = if self.config.spawn_interval.is_zero() {
                remaining
            } else {
                1
            };
            for _ in 0..batch {
                let command = self.spawn_command();
                out.push(command);
            }
            emitted += batch;

            let next = at.saturating_add(self.config.spawn_interval);
            self.pending = Some(self.clock.schedule_at(next, ()));
            if !self.config.spawn_interval.is_zero() {
                self.clock.advance(Duration::ZERO, &mut due);
            }
        }
    }

    fn spawn_command(&mut self) -> Command {
        let color = self.next_color();
        let position = self.next_position();
        debug!("requesting {color} ball at {position}");
        Command::SpawnBall { color, position }
    }

    fn next_color(&mut self) -> BallColor {
        let index = self.rng.gen_range(0..BallColor::ALL.len());
        BallColor::ALL[index]
    }

    fn next_position(&mut self) -> Vec3 {
        let board = self.config.board;
        let spread = board.width / 3.0;
        let x = self.rng.gen_range(-spread..=spread);
        let z = board.depth * 0.5 - self.config.ball_radius;
        Vec3::new(x, board.height, z)
    }
}
