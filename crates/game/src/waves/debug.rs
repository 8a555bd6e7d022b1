//! Wave diagnostics, dumped as JSON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use utils::frame::SimClock;

use super::{config::SpawnerConfig, state::WaveState, WavePhase};

/// Frames between two periodic dumps.
pub const DUMP_INTERVAL_FRAMES: u32 = 120;

/// Resource to toggle the periodic diagnostics dump.
#[derive(Resource, Default)]
pub struct WaveDebugEnabled(pub bool);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeDiagnostics {
    pub name: String,
    pub weight: f32,
    pub abilities: Vec<AbilitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySummary {
    pub name: String,
    pub kind: String,
    pub damage: i32,
    pub cooldown: f32,
    pub unlock_level: u32,
}

/// Snapshot of one spawner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveDiagnostics {
    pub spawner: u64,
    pub phase: WavePhase,
    pub level: u32,
    pub spawn_count: u32,
    pub spawn_interval: f32,
    pub spawned: u32,
    pub alive: u32,
    pub archetypes: Vec<ArchetypeDiagnostics>,
    pub total_kills: u32,
    pub failed_spawns: u32,
    pub skipped_slots: u32,
    pub waves_cleared: u32,
}

impl WaveDiagnostics {
    pub fn capture(spawner: Entity, config: &SpawnerConfig, state: &WaveState) -> Self {
        let archetypes = config
            .archetypes
            .iter()
            .enumerate()
            .map(|(index, archetype)| ArchetypeDiagnostics {
                name: archetype.name.clone(),
                weight: state.weights.get(index).copied().unwrap_or(0.0),
                abilities: state
                    .templates
                    .get(index)
                    .map(|abilities| {
                        abilities
                            .iter()
                            .map(|a| AbilitySummary {
                                name: a.name.clone(),
                                kind: a.kind.label().to_string(),
                                damage: a.damage,
                                cooldown: a.cooldown,
                                unlock_level: a.unlock_level,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            spawner: spawner.to_bits(),
            phase: state.phase,
            level: state.level,
            spawn_count: state.spawn_count,
            spawn_interval: state.spawn_interval,
            spawned: state.spawned,
            alive: state.alive,
            archetypes,
            total_kills: state.total_kills,
            failed_spawns: state.failed_spawns,
            skipped_slots: state.skipped_slots,
            waves_cleared: state.waves_cleared,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn wave_debug_dump_system(
    clock: Res<SimClock>,
    debug_enabled: Res<WaveDebugEnabled>,
    spawners: Query<(Entity, &SpawnerConfig, &WaveState)>,
) {
    if !debug_enabled.0 || clock.frame % DUMP_INTERVAL_FRAMES != 0 {
        return;
    }
    for (spawner, config, state) in spawners.iter() {
        match WaveDiagnostics::capture(spawner, config, state).to_json() {
            Ok(json) => info!("wave_debug{{f={}}} {}", clock.frame, json),
            Err(err) => info!("wave_debug{{f={}}} unserializable: {}", clock.frame, err),
        }
    }
}

pub struct WaveDebugPlugin;

impl Plugin for WaveDebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WaveDebugEnabled>();
        app.add_systems(
            Update,
            wave_debug_dump_system.in_set(crate::system_set::EncounterSystemSet::DeathManagement),
        );
    }
}
