//! Per-trial record captured from spawn to resolution.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BallColor, Outcome, PlacementVerdict, SessionId, TrialId};

/// Errors raised when a trial record is mutated out of order.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TrialError {
    /// Finalized records are immutable.
    #[error("trial {trial} is already finalized")]
    AlreadyFinalized {
        /// Identifier of the offending trial.
        trial: TrialId,
    },
    /// A ball may only be picked up once per trial.
    #[error("trial {trial} was already grasped")]
    AlreadyGrasped {
        /// Identifier of the offending trial.
        trial: TrialId,
    },
    /// Timestamps must not run backwards.
    #[error("trial {trial} received a timestamp earlier than a previous one")]
    TimeWentBackwards {
        /// Identifier of the offending trial.
        trial: TrialId,
    },
}

/// Record of a single trial.
///
/// Timestamps are game-clock offsets, so time spent paused never counts
/// towards a trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    session: SessionId,
    trial: TrialId,
    spawn_time: Duration,
    grasp_time: Option<Duration>,
    release_time: Option<Duration>,
    ball_color: BallColor,
    ball_size: f32,
    target_color: Option<BallColor>,
    target_size: Option<f32>,
    placement_error: f32,
    outcome: Option<Outcome>,
}

impl TrialRecord {
    /// Opens a record for a freshly spawned ball.
    #[must_use]
    pub fn new(
        session: SessionId,
        trial: TrialId,
        spawn_time: Duration,
        ball_color: BallColor,
        ball_size: f32,
    ) -> Self {
        Self {
            session,
            trial,
            spawn_time,
            grasp_time: None,
            release_time: None,
            ball_color,
            ball_size,
            target_color: None,
            target_size: None,
            placement_error: 0.0,
            outcome: None,
        }
    }

    /// Stamps the moment the ball was picked up.
    pub fn mark_grasped(&mut self, at: Duration) -> Result<(), TrialError> {
        if self.is_finalized() {
            return Err(TrialError::AlreadyFinalized { trial: self.trial });
        }
        if self.grasp_time.is_some() {
            return Err(TrialError::AlreadyGrasped { trial: self.trial });
        }
        if at < self.spawn_time {
            return Err(TrialError::TimeWentBackwards { trial: self.trial });
        }
        self.grasp_time = Some(at);
        Ok(())
    }

    /// Applies the evaluator's verdict and freezes the record.
    pub fn finalize(&mut self, released_at: Duration, verdict: &PlacementVerdict) -> Result<(), TrialError> {
        if self.is_finalized() {
            return Err(TrialError::AlreadyFinalized { trial: self.trial });
        }
        let earliest = self.grasp_time.unwrap_or(self.spawn_time);
        if released_at < earliest {
            return Err(TrialError::TimeWentBackwards { trial: self.trial });
        }
        self.release_time = Some(released_at);
        self.placement_error = verdict.error;
        self.outcome = Some(verdict.outcome);
        if let Some(target) = verdict.target {
            self.target_color = Some(target.color);
            self.target_size = Some(target.diameter);
        }
        Ok(())
    }

    /// Session the trial belongs to.
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Identifier of the trial.
    #[must_use]
    pub const fn trial(&self) -> TrialId {
        self.trial
    }

    /// Game time at which the ball spawned.
    #[must_use]
    pub const fn spawn_time(&self) -> Duration {
        self.spawn_time
    }

    /// Game time at which the ball was picked up.
    #[must_use]
    pub const fn grasp_time(&self) -> Option<Duration> {
        self.grasp_time
    }

    /// Game time at which the trial was finalized.
    #[must_use]
    pub const fn release_time(&self) -> Option<Duration> {
        self.release_time
    }

    /// Time from spawn to release, available once finalized.
    #[must_use]
    pub fn completion_time(&self) -> Option<Duration> {
        self.release_time
            .map(|release| release.saturating_sub(self.spawn_time))
    }

    /// Color of the ball.
    #[must_use]
    pub const fn ball_color(&self) -> BallColor {
        self.ball_color
    }

    /// Diameter of the ball in board units.
    #[must_use]
    pub const fn ball_size(&self) -> f32 {
        self.ball_size
    }

    /// Color of the receiving hole, set only on success.
    #[must_use]
    pub const fn target_color(&self) -> Option<BallColor> {
        self.target_color
    }

    /// Diameter of the receiving hole, set only on success.
    #[must_use]
    pub const fn target_size(&self) -> Option<f32> {
        self.target_size
    }

    /// Planar distance from the release point to the nearest compatible hole.
    #[must_use]
    pub const fn placement_error(&self) -> f32 {
        self.placement_error
    }

    /// Outcome of the trial, unset until finalized.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Reports whether the record has been finalized.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }
}
