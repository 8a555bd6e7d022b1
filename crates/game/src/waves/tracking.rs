//! Wave enemy tracking components.

use bevy::prelude::*;

/// Live enemy placed by a spawner.
///
/// Lets the spawner:
/// - match [`Died`](crate::character::health::Died) notifications to its own enemies
/// - find its enemies again on reset
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveEnemy {
    pub spawner: Entity,
    /// Wave level the enemy was spawned at
    pub wave: u32,
}

/// Entity every enemy of a spawner targets.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostileTarget(pub Entity);

/// Spawner still waiting for its first wave.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PendingAutoStart;
