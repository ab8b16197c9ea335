#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Sorting Board.
//!
//! The world owns the ball pool, the active trial set, every ball's
//! interaction state, the game clock and the level state. It is the only
//! writer of that state: systems read it through [`query`] and request
//! changes by submitting commands to [`apply`].

mod pool;

use std::time::Duration;

use glam::Vec3;
use log::{debug, info, warn};
use sorting_board_core::{
    BallColor, BallId, Command, Due, Event, GameState, Hole, HoleId, InteractionRejection,
    InteractionState, LevelConfig, PlacementVerdict, Scheduler, SessionId, SpawnRejection,
    TrialId, TrialRecord, WELCOME_BANNER,
};

use self::pool::BallPool;

/// Represents the authoritative Sorting Board world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: LevelConfig,
    holes: Vec<Hole>,
    pool: BallPool,
    state: GameState,
    clock: Duration,
    settle: Scheduler<BallId>,
    session: SessionId,
    next_trial: TrialId,
    spawned: u32,
    hovered: Option<BallId>,
    dragged: Option<BallId>,
    highlighted: Option<HoleId>,
}

impl World {
    /// Creates a world for the provided level, with the pool fully allocated.
    ///
    /// The configuration is expected to have been validated beforehand.
    #[must_use]
    pub fn new(config: LevelConfig) -> Self {
        let holes = (0..config.holes.len())
            .filter_map(|index| {
                let id = HoleId::new(index as u32);
                let center = config.hole_center(id)?;
                Some(Hole::new(id, config.holes[index], center))
            })
            .collect();
        let pool = BallPool::with_capacity(config.pool_capacity());
        Self {
            banner: WELCOME_BANNER,
            holes,
            pool,
            state: GameState::Initializing,
            clock: Duration::ZERO,
            settle: Scheduler::new(),
            session: SessionId::new("unassigned"),
            next_trial: TrialId::FIRST,
            spawned: 0,
            hovered: None,
            dragged: None,
            highlighted: None,
            config,
        }
    }

    fn reject_interaction(
        &self,
        ball: Option<BallId>,
        reason: InteractionRejection,
        out_events: &mut Vec<Event>,
    ) {
        debug!("interaction on {ball:?} rejected: {reason:?}");
        out_events.push(Event::InteractionRejected { ball, reason });
    }

    fn set_hover(&mut self, ball: Option<BallId>, out_events: &mut Vec<Event>) {
        let previous = self.hovered.take();
        if let Some(previous) = previous {
            if let Some(entity) = self.pool.get_mut(previous) {
                if entity.state == InteractionState::Hovered {
                    entity.state = InteractionState::Idle;
                }
            }
        }
        if let Some(current) = ball {
            if let Some(entity) = self.pool.get_mut(current) {
                entity.state = InteractionState::Hovered;
                self.hovered = Some(current);
            }
        }
        if previous != self.hovered {
            out_events.push(Event::HoverChanged {
                previous,
                current: self.hovered,
            });
        }
    }

    fn return_ball(&mut self, ball: BallId, out_events: &mut Vec<Event>) -> bool {
        if !self.pool.release(ball) {
            return false;
        }
        let _ = self.settle.cancel_where(|pending| *pending == ball);
        if self.hovered == Some(ball) {
            self.hovered = None;
        }
        if self.dragged == Some(ball) {
            self.dragged = None;
        }
        out_events.push(Event::BallReturned { ball });
        true
    }

    fn settle_due_balls(&mut self, due: Vec<Due<BallId>>, out_events: &mut Vec<Event>) {
        for Due { key: ball, .. } in due {
            if let Some(entity) = self.pool.get_mut(ball) {
                if entity.state == InteractionState::Spawning {
                    entity.state = InteractionState::Idle;
                    out_events.push(Event::BallSettled { ball });
                }
            }
        }
    }

    fn spawn(&mut self, color: BallColor, position: Vec3, out_events: &mut Vec<Event>) {
        let rejection = if self.state != GameState::Playing {
            Some(SpawnRejection::NotPlaying)
        } else if self.spawned >= self.config.total_trials {
            Some(SpawnRejection::TargetReached)
        } else if self.pool.available() == 0 {
            Some(SpawnRejection::PoolExhausted)
        } else {
            None
        };
        if let Some(reason) = rejection {
            warn!("spawn rejected: {reason:?}");
            out_events.push(Event::SpawnRejected { reason });
            return;
        }

        let trial = self.next_trial;
        let size = self.config.ball_diameter;
        let record = TrialRecord::new(self.session.clone(), trial, self.clock, color, size);
        let Some(ball) = self.pool.acquire(record, color, position) else {
            warn!("spawn rejected: {:?}", SpawnRejection::PoolExhausted);
            out_events.push(Event::SpawnRejected {
                reason: SpawnRejection::PoolExhausted,
            });
            return;
        };
        self.next_trial = trial.next();
        self.spawned += 1;
        debug!("spawned trial {trial} as {ball:?} ({color})");
        out_events.push(Event::BallSpawned {
            ball,
            trial,
            color,
            size,
            position,
        });

        let settle_time = self.config.settle_time();
        if settle_time.is_zero() {
            self.settle_due_balls(vec![Due { at: self.clock, key: ball }], out_events);
        } else {
            let _ = self.settle.schedule_after(settle_time, ball);
        }
    }

    fn grasp(&mut self, ball: BallId, out_events: &mut Vec<Event>) {
        if self.state != GameState::Playing {
            self.reject_interaction(Some(ball), InteractionRejection::NotPlaying, out_events);
            return;
        }
        if self.dragged.is_some() {
            self.reject_interaction(Some(ball), InteractionRejection::AlreadyDragging, out_events);
            return;
        }
        let clock = self.clock;
        let Some(entity) = self.pool.get_mut(ball) else {
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        if !entity.state.is_interactable() {
            self.reject_interaction(Some(ball), InteractionRejection::NotInteractable, out_events);
            return;
        }
        let Some(record) = entity.record.as_mut() else {
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        if let Err(error) = record.mark_grasped(clock) {
            warn!("grasp of {ball:?} refused: {error}");
            self.reject_interaction(Some(ball), InteractionRejection::RecordRejected, out_events);
            return;
        }
        let trial = record.trial();
        entity.state = InteractionState::Dragged;
        let position = entity.position;
        if self.hovered == Some(ball) {
            self.hovered = None;
            out_events.push(Event::HoverChanged {
                previous: Some(ball),
                current: None,
            });
        }
        self.dragged = Some(ball);
        out_events.push(Event::BallGrasped {
            ball,
            trial,
            position,
        });
    }

    fn drag(&mut self, ball: BallId, position: Vec3, out_events: &mut Vec<Event>) {
        if self.state != GameState::Playing {
            self.reject_interaction(Some(ball), InteractionRejection::NotPlaying, out_events);
            return;
        }
        if self.dragged != Some(ball) {
            self.reject_interaction(Some(ball), InteractionRejection::NotDragged, out_events);
            return;
        }
        if let Some(entity) = self.pool.get_mut(ball) {
            entity.position = position;
            out_events.push(Event::BallMoved { ball, position });
        }
    }

    fn release(&mut self, ball: BallId, position: Vec3, out_events: &mut Vec<Event>) {
        if self.state != GameState::Playing {
            self.reject_interaction(Some(ball), InteractionRejection::NotPlaying, out_events);
            return;
        }
        if self.dragged != Some(ball) {
            self.reject_interaction(Some(ball), InteractionRejection::NotDragged, out_events);
            return;
        }
        let Some(entity) = self.pool.get_mut(ball) else {
            self.dragged = None;
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        let Some(trial) = entity.record.as_ref().map(TrialRecord::trial) else {
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        entity.position = position;
        entity.release_pending = true;
        let color = entity.color;
        self.dragged = None;
        out_events.push(Event::BallReleased {
            ball,
            trial,
            color,
            size: self.config.ball_diameter,
            position,
        });
    }

    fn finalize(&mut self, ball: BallId, verdict: PlacementVerdict, out_events: &mut Vec<Event>) {
        let clock = self.clock;
        let Some(entity) = self.pool.get_mut(ball) else {
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        if entity.state != InteractionState::Dragged || !entity.release_pending {
            self.reject_interaction(Some(ball), InteractionRejection::NotReleased, out_events);
            return;
        }
        let Some(record) = entity.record.as_mut() else {
            self.reject_interaction(Some(ball), InteractionRejection::UnknownBall, out_events);
            return;
        };
        if let Err(error) = record.finalize(clock, &verdict) {
            warn!("finalization of {ball:?} refused: {error}");
            self.reject_interaction(Some(ball), InteractionRejection::RecordRejected, out_events);
            return;
        }
        let record = record.clone();
        entity.release_pending = false;
        entity.state = if verdict.is_valid() {
            InteractionState::Placed
        } else {
            InteractionState::Failed
        };
        if let Some(snap) = verdict.snap_position() {
            entity.position = snap;
        }
        let position = entity.position;
        debug!(
            "trial {} finalized as {} (error {:.2})",
            record.trial(),
            verdict.outcome,
            verdict.error
        );
        out_events.push(Event::TrialFinalized {
            ball,
            record,
            position,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            if world.state != GameState::Playing {
                return;
            }
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            let mut due = Vec::new();
            world.settle.advance(dt, &mut due);
            world.settle_due_balls(due, out_events);
        }
        Command::SetGameState { state } => {
            let from = world.state;
            if from.can_transition_to(state) {
                world.state = state;
                info!("game state {from:?} -> {state:?}");
                out_events.push(Event::GameStateChanged { from, to: state });
            } else {
                warn!("transition {from:?} -> {state:?} rejected");
                out_events.push(Event::TransitionRejected {
                    from,
                    requested: state,
                });
            }
        }
        Command::BeginSession { session } => {
            world.session = session.clone();
            world.next_trial = TrialId::FIRST;
            world.spawned = 0;
            info!("session {session} started");
            out_events.push(Event::SessionStarted { session });
        }
        Command::SpawnBall { color, position } => world.spawn(color, position, out_events),
        Command::HoverBall { ball } => {
            if world.hovered == ball {
                return;
            }
            if world.state != GameState::Playing {
                world.reject_interaction(ball, InteractionRejection::NotPlaying, out_events);
                return;
            }
            if let Some(candidate) = ball {
                if world.dragged.is_some() {
                    world.reject_interaction(ball, InteractionRejection::AlreadyDragging, out_events);
                    return;
                }
                match world.pool.get(candidate) {
                    None => {
                        world.reject_interaction(ball, InteractionRejection::UnknownBall, out_events);
                        return;
                    }
                    Some(entity) if !entity.state.is_interactable() => {
                        world.reject_interaction(
                            ball,
                            InteractionRejection::NotInteractable,
                            out_events,
                        );
                        return;
                    }
                    Some(_) => {}
                }
            }
            world.set_hover(ball, out_events);
        }
        Command::GraspBall { ball } => world.grasp(ball, out_events),
        Command::DragBall { ball, position } => world.drag(ball, position, out_events),
        Command::ReleaseBall { ball, position } => world.release(ball, position, out_events),
        Command::FinalizeTrial { ball, verdict } => world.finalize(ball, verdict, out_events),
        Command::ReturnToPool { ball } => {
            if !world.return_ball(ball, out_events) {
                debug!("{ball:?} is not active; return ignored");
            }
        }
        Command::ClearBoard => {
            let active: Vec<BallId> = world.pool.active_ids().to_vec();
            let mut returned = 0;
            for ball in active {
                if world.return_ball(ball, out_events) {
                    returned += 1;
                }
            }
            world.settle.clear();
            info!("board cleared ({returned} balls returned)");
            out_events.push(Event::BoardCleared { returned });
        }
        Command::HighlightHole { hole } => {
            if world.highlighted == hole {
                return;
            }
            let previous = world.highlighted;
            world.highlighted = hole;
            out_events.push(Event::HoleHighlightChanged {
                previous,
                current: hole,
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use sorting_board_core::{
        BallId, BallSnapshot, BallView, GameState, Hole, HoleId, LevelConfig, SessionId,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Level configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &LevelConfig {
        &world.config
    }

    /// Active game state.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.state
    }

    /// Game time accumulated while playing.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Identifier of the running session.
    #[must_use]
    pub fn session(world: &World) -> &SessionId {
        &world.session
    }

    /// Holes in configuration order.
    #[must_use]
    pub fn holes(world: &World) -> &[Hole] {
        &world.holes
    }

    /// Captures a read-only view of the active balls.
    #[must_use]
    pub fn ball_view(world: &World) -> BallView {
        let snapshots = world
            .pool
            .iter_active()
            .filter_map(|entity| {
                let record = entity.record.as_ref()?;
                Some(BallSnapshot {
                    id: entity.id,
                    trial: record.trial(),
                    color: entity.color,
                    size: record.ball_size(),
                    position: entity.position,
                    state: entity.state,
                })
            })
            .collect();
        BallView::from_snapshots(snapshots)
    }

    /// Ball currently under the pointer.
    #[must_use]
    pub fn hovered(world: &World) -> Option<BallId> {
        world.hovered
    }

    /// Ball currently following the pointer.
    #[must_use]
    pub fn dragged(world: &World) -> Option<BallId> {
        world.dragged
    }

    /// Hole currently highlighted as a drop hint.
    #[must_use]
    pub fn highlighted_hole(world: &World) -> Option<HoleId> {
        world.highlighted
    }

    /// Number of pooled entities.
    #[must_use]
    pub fn pool_capacity(world: &World) -> usize {
        world.pool.capacity()
    }

    /// Number of pooled entities not currently in use.
    #[must_use]
    pub fn available_balls(world: &World) -> usize {
        world.pool.available()
    }

    /// Number of balls in the active trial set.
    #[must_use]
    pub fn active_count(world: &World) -> usize {
        world.pool.active_ids().len()
    }

    /// Number of trials spawned in the running session.
    #[must_use]
    pub fn spawned_count(world: &World) -> u32 {
        world.spawned
    }

    /// Number of trials the level spawns.
    #[must_use]
    pub fn target_count(world: &World) -> u32 {
        world.config.total_trials
    }

    /// Reports whether every trial of the level has been spawned and resolved.
    #[must_use]
    pub fn all_trials_resolved(world: &World) -> bool {
        world.spawned >= world.config.total_trials
            && world
                .pool
                .iter_active()
                .all(|entity| entity.state.is_terminal())
    }
}
