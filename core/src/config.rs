//! Level configuration shared by every component.
//!
//! All lengths are expressed in board units, where one board unit equals one
//! millimetre and one reported pixel. Durations are stored as seconds so the
//! configuration reads naturally from TOML.

use std::{path::PathBuf, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BallColor, HoleId};

/// Errors reported when validating a [`LevelConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A level must contain at least one trial.
    #[error("total_trials must be positive")]
    NoTrials,
    /// A duration field held a negative or non-finite value.
    #[error("{field} must be a finite, non-negative number of seconds (received {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// Ball diameter must be strictly positive.
    #[error("ball_diameter must be positive (received {value})")]
    InvalidBallDiameter {
        /// Value that failed validation.
        value: f32,
    },
    /// Board dimensions must be strictly positive.
    #[error("board dimensions must be positive (received {width} x {depth})")]
    InvalidBoard {
        /// Configured board width.
        width: f32,
        /// Configured board depth.
        depth: f32,
    },
    /// The board requires at least one hole.
    #[error("at least one hole must be configured")]
    MissingHoles,
    /// Hole diameters must be strictly positive.
    #[error("hole {index} diameter must be positive (received {diameter})")]
    InvalidHoleDiameter {
        /// Position of the hole in configuration order.
        index: usize,
        /// Value that failed validation.
        diameter: f32,
    },
    /// Export was enabled without any output format.
    #[error("export is enabled but neither csv nor json output is selected")]
    NoExportFormat,
}

/// Hole carved into the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoleConfig {
    /// Diameter of the hole in board units.
    pub diameter: f32,
    /// Color the hole accepts.
    pub color: BallColor,
}

impl HoleConfig {
    /// Creates a new hole description.
    #[must_use]
    pub const fn new(diameter: f32, color: BallColor) -> Self {
        Self { diameter, color }
    }

    /// Reports whether a ball of the provided color and size fits the hole.
    #[must_use]
    pub fn accepts(&self, color: BallColor, size: f32) -> bool {
        self.color == color && size <= self.diameter
    }
}

/// Physical dimensions of the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Extent along the x axis.
    pub width: f32,
    /// Extent along the z axis.
    pub depth: f32,
    /// Height of the board surface above the floor.
    pub height: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            depth: 600.0,
            height: 900.0,
        }
    }
}

/// Presentation parameters forwarded to window adapters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Frame rate the adapter should aim for.
    pub target_fps: u32,
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            window_width: 1280,
            window_height: 720,
        }
    }
}

/// Controls how finalized trials are persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Whether session files are written at all.
    pub enabled: bool,
    /// Whether a CSV file is written.
    pub csv: bool,
    /// Whether a JSON file is written.
    pub json: bool,
    /// Directory receiving session files. Adapters supply a default when unset.
    pub directory: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csv: true,
            json: true,
            directory: None,
        }
    }
}

/// Immutable description of the single level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Number of trials spawned in the level.
    pub total_trials: u32,
    /// Seconds of game time between spawns.
    pub spawn_interval: f32,
    /// Diameter of every ball in board units.
    pub ball_diameter: f32,
    /// Board dimensions.
    pub board: BoardConfig,
    /// Holes in configuration order.
    pub holes: Vec<HoleConfig>,
    /// Seconds a freshly spawned ball needs before it becomes interactable.
    pub settle_time: f32,
    /// Seconds to wait after setup before play begins.
    pub auto_start_delay: f32,
    /// Extra pooled entities allocated beyond `total_trials`.
    pub pool_margin: u32,
    /// Seed for spawn colors and positions. Entropy is used when absent.
    pub seed: Option<u64>,
    /// Session export settings.
    pub export: ExportConfig,
    /// Window parameters for adapters.
    pub display: DisplayConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            total_trials: 20,
            spawn_interval: 2.0,
            ball_diameter: 120.0,
            board: BoardConfig::default(),
            holes: vec![
                HoleConfig::new(160.0, BallColor::Red),
                HoleConfig::new(140.0, BallColor::Blue),
                HoleConfig::new(120.0, BallColor::Yellow),
            ],
            settle_time: 0.25,
            auto_start_delay: 1.0,
            pool_margin: 5,
            seed: None,
            export: ExportConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl LevelConfig {
    /// Checks every invariant the rest of the game relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        check_seconds("spawn_interval", self.spawn_interval)?;
        check_seconds("settle_time", self.settle_time)?;
        check_seconds("auto_start_delay", self.auto_start_delay)?;
        if !(self.ball_diameter.is_finite() && self.ball_diameter > 0.0) {
            return Err(ConfigError::InvalidBallDiameter {
                value: self.ball_diameter,
            });
        }
        let BoardConfig { width, depth, .. } = self.board;
        if !(width.is_finite() && width > 0.0 && depth.is_finite() && depth > 0.0) {
            return Err(ConfigError::InvalidBoard { width, depth });
        }
        if self.holes.is_empty() {
            return Err(ConfigError::MissingHoles);
        }
        for (index, hole) in self.holes.iter().enumerate() {
            if !(hole.diameter.is_finite() && hole.diameter > 0.0) {
                return Err(ConfigError::InvalidHoleDiameter {
                    index,
                    diameter: hole.diameter,
                });
            }
        }
        if self.export.enabled && !self.export.csv && !self.export.json {
            return Err(ConfigError::NoExportFormat);
        }
        Ok(())
    }

    /// Game time between spawns.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        seconds(self.spawn_interval)
    }

    /// Game time a spawned ball needs to settle.
    #[must_use]
    pub fn settle_time(&self) -> Duration {
        seconds(self.settle_time)
    }

    /// Frame time to wait before play begins.
    #[must_use]
    pub fn auto_start_delay(&self) -> Duration {
        seconds(self.auto_start_delay)
    }

    /// Number of entities the pool pre-allocates.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        self.total_trials as usize + self.pool_margin as usize
    }

    /// Radius of every ball in board units.
    #[must_use]
    pub fn ball_radius(&self) -> f32 {
        self.ball_diameter * 0.5
    }

    /// Center of the hole at `hole`, spread evenly across the board width.
    #[must_use]
    pub fn hole_center(&self, hole: HoleId) -> Option<Vec3> {
        let index = hole.get() as usize;
        if index >= self.holes.len() {
            return None;
        }
        let spacing = self.board.width / (self.holes.len() + 1) as f32;
        Some(Vec3::new(
            -self.board.width * 0.5 + spacing * (index + 1) as f32,
            self.board.height,
            0.0,
        ))
    }
}

fn check_seconds(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { field, value })
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}
