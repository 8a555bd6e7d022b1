pub mod enemy;
pub mod health;

use bevy::prelude::*;

use crate::{
    character::{
        enemy::{ability::execution::ability_execution_system, ai},
        health::{apply_damage_system, AttackReaction, DamageMessage, Died},
    },
    system_set::EncounterSystemSet,
};

/// Damage, death, enemy behaviour and ability execution.
pub struct CharacterPlugin;

impl Plugin for CharacterPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<DamageMessage>();
        app.add_message::<Died>();
        app.add_message::<AttackReaction>();

        app.add_systems(
            Update,
            (
                ai::attack_reaction_system,
                ai::enemy_ability_selection_system,
                ai::enemy_chase_system,
                ai::enemy_locomotion_system,
                ai::look_at_system,
            )
                .chain()
                .in_set(EncounterSystemSet::EnemyAI),
        );
        app.add_systems(Update, ability_execution_system.in_set(EncounterSystemSet::Abilities));
        app.add_systems(Update, apply_damage_system.in_set(EncounterSystemSet::Damage));
    }
}

/// World position of anything that takes part in the encounter.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec3);

/// Orientation, only ever rotated around the up axis.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Facing(pub Quat);

impl Default for Facing {
    fn default() -> Self {
        Self(Quat::IDENTITY)
    }
}

impl Facing {
    pub fn forward(&self) -> Vec3 {
        self.0 * Vec3::Z
    }
}

/// Pooled, inactive entity. Every encounter system skips it.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Dormant;

/// Zone or projectile spawned by an ability of `0`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedBy(pub Entity);

/// Yaw-only rotation looking from `from` toward `to`, `None` when they share
/// the same ground position.
pub fn yaw_towards(from: Vec3, to: Vec3) -> Option<Quat> {
    let delta = to - from;
    if delta.x * delta.x + delta.z * delta.z < 1e-6 {
        return None;
    }
    Some(Quat::from_rotation_y(delta.x.atan2(delta.z)))
}

/// Distance on the ground plane.
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}
