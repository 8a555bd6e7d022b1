//! Enemy Behavior System
//!
//! The autonomous loop of an unlocked actor: pick the first usable ability,
//! otherwise chase the target through the path follower.

use bevy::prelude::*;
use tracing::warn;
use utils::frame::SimClock;

use crate::{
    character::{
        enemy::{
            ability::{
                execution::{begin_ability, AbilityServices, ActiveAbility, ActorMut, TargetView},
                EnemyAbilities, UseContext,
            },
            Enemy, EnemyTarget, MovementLock,
        },
        health::{Damageable, Health},
        yaw_towards, Dormant, Facing, Position,
    },
    services::{PathService, SightService},
};

use super::state::MonsterState;

/// Live target of an actor, `None` when unset, dormant, dead or gone.
fn resolve_target(
    target: &EnemyTarget,
    targets: &Query<(&Position, &Health), (Without<Enemy>, Without<Dormant>)>,
) -> Option<TargetView> {
    let entity = target.0?;
    let (position, health) = targets.get(entity).ok()?;
    health.is_alive().then_some(TargetView {
        entity,
        position: position.0,
    })
}

/// At most one activation per actor per tick, first usable ability in list
/// order wins.
pub fn enemy_ability_selection_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    sight: Res<SightService>,
    mut services: AbilityServices,
    mut actors: Query<
        (
            Entity,
            &Enemy,
            &mut EnemyAbilities,
            &mut Position,
            &mut Facing,
            &mut MovementLock,
            &mut MonsterState,
            &EnemyTarget,
        ),
        (Without<ActiveAbility>, Without<Dormant>),
    >,
    targets: Query<(&Position, &Health), (Without<Enemy>, Without<Dormant>)>,
) {
    for (entity, enemy, mut abilities, mut position, mut facing, mut lock, mut state, target) in actors.iter_mut() {
        if lock.is_locked() {
            continue;
        }
        let Some(target) = resolve_target(target, &targets) else {
            continue;
        };
        if let Some(slot) = abilities.activating() {
            warn!("{:?} has ability {} activating without a running procedure", entity, slot);
            continue;
        }

        let ctx = UseContext {
            now: clock.now(),
            level: enemy.level,
            origin: position.0,
            target: target.position,
            sight: sight.0.as_ref(),
        };
        let Some(slot) = abilities.first_usable(&ctx) else {
            continue;
        };

        let mut actor = ActorMut {
            entity,
            position: &mut position,
            facing: &mut facing,
            lock: &mut lock,
            state: &mut state,
        };
        let active = begin_ability(&mut commands, &mut services, &mut actor, &mut abilities.0[slot], slot, target);
        commands.entity(entity).insert(active);
    }
}

/// Points the path follower of every free actor at its target.
pub fn enemy_chase_system(
    mut path: ResMut<PathService>,
    mut actors: Query<
        (Entity, &Position, &mut Facing, &MovementLock, &mut MonsterState, &EnemyTarget),
        (With<Enemy>, Without<Dormant>),
    >,
    targets: Query<(&Position, &Health), (Without<Enemy>, Without<Dormant>)>,
) {
    for (entity, position, mut facing, lock, mut state, target) in actors.iter_mut() {
        if lock.is_locked() || *state == MonsterState::UsingAbility {
            continue;
        }
        let Some(target) = resolve_target(target, &targets) else {
            if *state == MonsterState::Chase {
                *state = MonsterState::Idle;
            }
            continue;
        };

        *state = MonsterState::Chase;
        path.0.set_destination(entity, target.position);
        if let Some(toward) = yaw_towards(position.0, target.position) {
            facing.0 = toward;
        }
    }
}

/// Applies the path follower's motion to unlocked actors.
pub fn enemy_locomotion_system(
    clock: Res<SimClock>,
    mut path: ResMut<PathService>,
    mut actors: Query<(Entity, &mut Position, &MovementLock), (With<Enemy>, Without<Dormant>)>,
) {
    for (entity, mut position, lock) in actors.iter_mut() {
        if lock.is_locked() {
            continue;
        }
        if let Some(next) = path.0.next_position(entity, clock.delta) {
            position.0 = next;
        }
    }
}
