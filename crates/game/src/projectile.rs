//! Volley projectiles and the sweep of transients left without an owner.

use bevy::prelude::*;
use tracing::trace;
use utils::frame::SimClock;

use crate::character::{
    enemy::Enemy,
    flat_distance,
    health::{DamageMessage, Damageable, Health},
    Dormant, Position, SpawnedBy,
};

/// Ground radius of a damageable body, added to the projectile radius on impact.
pub const BODY_RADIUS: f32 = 0.5;

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Projectile {
    pub direction: Vec3,
    pub speed: f32,
    pub damage: i32,
    pub target: Entity,
    pub radius: f32,
    /// Seconds before it vanishes without hitting anything
    pub remaining_life: f32,
}

pub fn spawn_projectile(commands: &mut Commands, owner: Entity, projectile: Projectile, at: Vec3) -> Entity {
    commands.spawn((projectile, Position(at), SpawnedBy(owner))).id()
}

pub fn projectile_flight_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Position, &SpawnedBy)>,
    targets: Query<(&Position, &Health), (Without<Projectile>, Without<Dormant>)>,
    mut damage_writer: MessageWriter<DamageMessage>,
) {
    for (entity, mut projectile, mut position, owner) in projectiles.iter_mut() {
        let Ok((target_position, health)) = targets.get(projectile.target) else {
            commands.entity(entity).try_despawn();
            continue;
        };
        if !health.is_alive() {
            commands.entity(entity).try_despawn();
            continue;
        }

        position.0 += projectile.direction * projectile.speed * clock.delta;
        projectile.remaining_life -= clock.delta;

        if flat_distance(position.0, target_position.0) <= projectile.radius + BODY_RADIUS {
            trace!("projectile{{f={} hit={:?}}}", clock.frame, projectile.target);
            damage_writer.write(DamageMessage {
                target: projectile.target,
                amount: projectile.damage,
                source: Some(owner.0),
            });
            commands.entity(entity).try_despawn();
        } else if projectile.remaining_life <= 0.0 {
            commands.entity(entity).try_despawn();
        }
    }
}

/// Despawns zones and projectiles whose owner is gone or back in the pool.
pub fn despawn_orphaned_transients_system(
    mut commands: Commands,
    transients: Query<(Entity, &SpawnedBy)>,
    owners: Query<(), (With<Enemy>, Without<Dormant>)>,
) {
    for (entity, owner) in transients.iter() {
        if !owners.contains(owner.0) {
            trace!("transient {:?} orphaned by {:?}", entity, owner.0);
            commands.entity(entity).try_despawn();
        }
    }
}
