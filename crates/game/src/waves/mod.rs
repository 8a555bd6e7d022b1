//! Wave-based enemy population control.
//!
//! # Overview
//!
//! Every spawner entity carries its own [`SpawnerConfig`], [`WaveState`] and
//! pool of dormant shells. A wave:
//! - raises the level and rescales every archetype's abilities
//! - re-rolls and normalizes the archetype weights
//! - spawns `spawn_count` enemies, one per `spawn_interval`, on the navmesh
//! - clears once every spawned enemy died, then scales the next wave up
//!   from the wave 0 baselines
//!
//! # Wave Flow
//!
//! ```text
//! Idle → Spawning → WaveActive → WaveCleared ─┬→ Spawning (continuous)
//!  ↑                                          └→ Idle
//!  └──────────────── Reset ─────────────────────
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let spawner = spawn_spawner(&mut commands, SpawnerConfig::load("assets/waves/spawner.ron")?, Some(player))?;
//! ```

pub mod config;
pub mod debug;
pub mod selection;
pub mod state;
pub mod systems;
pub mod tracking;

use bevy::prelude::*;

use crate::system_set::EncounterSystemSet;

pub use config::{ArchetypeConfig, FailedSpawnPolicy, SpawnMethod, SpawnerConfig};
pub use debug::{WaveDebugEnabled, WaveDebugPlugin, WaveDiagnostics};
pub use state::{WavePhase, WaveState};
pub use systems::{spawn_spawner, SpawnFailed, WaveCleared, WaveCommand, WaveControl};
pub use tracking::{HostileTarget, WaveEnemy};

/// Plugin that adds the wave spawning system.
pub struct WaveSystemPlugin;

impl Plugin for WaveSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(WaveDebugPlugin);

        app.add_message::<WaveControl>();
        app.add_message::<SpawnFailed>();
        app.add_message::<WaveCleared>();

        app.add_systems(
            Update,
            (systems::wave_control_system, systems::wave_spawning_system)
                .chain()
                .in_set(EncounterSystemSet::Spawning),
        );

        // Runs after damage so the same tick's deaths are counted
        app.add_systems(
            Update,
            systems::wave_enemy_death_system.in_set(EncounterSystemSet::DeathManagement),
        );
    }
}
