pub mod area_damage;
pub mod args;
pub mod character;
pub mod error;
pub mod projectile;
pub mod scaling;
pub mod services;
pub mod system_set;
pub mod waves;

use bevy::prelude::*;
use utils::{
    frame::{advance_sim_clock_system, SimClock},
    rng::SimRng,
};

use crate::{
    area_damage::{builtin_trigger_system, follow_owner_system, zone_contact_system, zone_tick_system, BuiltinTriggers, ZoneContact},
    character::{health::apply_damage_system, CharacterPlugin},
    projectile::{despawn_orphaned_transients_system, projectile_flight_system},
    services::{AnimationService, NavMeshService, PathService, SightService},
    system_set::EncounterSystemSet,
    waves::{systems::wave_enemy_death_system, WaveSystemPlugin},
};

/// Whole encounter simulation, ticked in `Update`.
///
/// Services already present in the world are kept, the reference
/// implementations fill the gaps.
pub struct EncounterPlugin;

impl Plugin for EncounterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>();
        app.init_resource::<SimRng>();
        app.init_resource::<NavMeshService>();
        app.init_resource::<PathService>();
        app.init_resource::<AnimationService>();
        app.init_resource::<SightService>();

        app.configure_sets(
            Update,
            (
                EncounterSystemSet::Clock,
                EncounterSystemSet::Triggers,
                EncounterSystemSet::Spawning,
                EncounterSystemSet::EnemyAI,
                EncounterSystemSet::Abilities,
                EncounterSystemSet::Damage,
                EncounterSystemSet::DeathManagement,
            )
                .chain(),
        );

        app.add_message::<ZoneContact>();
        app.add_plugins((CharacterPlugin, WaveSystemPlugin));

        app.add_systems(Update, advance_sim_clock_system.in_set(EncounterSystemSet::Clock));
        app.add_systems(
            Update,
            (
                follow_owner_system,
                builtin_trigger_system.run_if(resource_exists::<BuiltinTriggers>),
                zone_contact_system,
            )
                .chain()
                .in_set(EncounterSystemSet::Triggers),
        );
        app.add_systems(
            Update,
            (projectile_flight_system, zone_tick_system)
                .before(apply_damage_system)
                .in_set(EncounterSystemSet::Damage),
        );
        app.add_systems(
            Update,
            despawn_orphaned_transients_system
                .after(wave_enemy_death_system)
                .in_set(EncounterSystemSet::DeathManagement),
        );
    }
}
