#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares the Sorting Board experience.

use log::info;
use sorting_board_core::{ConfigError, Hole, LevelConfig};
use sorting_board_world::{query, World};
use thiserror::Error;

/// Reasons the level cannot be set up.
#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    /// The level configuration is invalid.
    #[error("invalid level configuration: {0}")]
    Config(#[from] ConfigError),
    /// Export is enabled but no directory was provided.
    #[error("session export is enabled but no export directory was provided")]
    MissingExportDirectory,
}

/// Validates configuration and produces data required to greet the player.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Checks every dependency of the level and builds its world.
    pub fn prepare(&self, config: LevelConfig) -> Result<World, SetupError> {
        config.validate()?;
        if config.export.enabled && config.export.directory.is_none() {
            return Err(SetupError::MissingExportDirectory);
        }
        info!(
            "level ready: {} trials, {} holes, pool of {}",
            config.total_trials,
            config.holes.len(),
            config.pool_capacity()
        );
        Ok(World::new(config))
    }

    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner<'world>(&self, world: &'world World) -> &'world str {
        query::welcome_banner(world)
    }

    /// Exposes the holes required for rendering.
    #[must_use]
    pub fn holes<'world>(&self, world: &'world World) -> &'world [Hole] {
        query::holes(world)
    }
}
