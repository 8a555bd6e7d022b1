use bevy::prelude::*;
use thiserror::Error;

/// Why a spawn slot could not be filled.
///
/// The first group are configuration errors, the second resource exhaustion.
/// All of them are reported and the slot retried or skipped, except
/// [`SpawnError::NoArchetypes`] which halts the spawner.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpawnError {
    #[error("no archetypes configured")]
    NoArchetypes,
    #[error("spawn weights sum to zero")]
    ZeroWeights,
    #[error("weighted draw {draw} exhausted the weight vector (total mass {total})")]
    WeightsExhausted { draw: f32, total: f32 },

    #[error("pool for archetype {0} has no free instance")]
    PoolExhausted(usize),
    #[error("no walkable point within {radius} of {desired:?}")]
    NoWalkablePoint { desired: Vec3, radius: f32 },
    #[error("navmesh triangulation has no vertices")]
    EmptyTriangulation,
    #[error("pooled instance {0:?} is not a spawnable enemy")]
    StaleInstance(Entity),
}

impl SpawnError {
    /// Configuration errors that can never succeed on retry.
    pub fn is_fatal_for_spawner(&self) -> bool {
        matches!(self, SpawnError::NoArchetypes)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}
