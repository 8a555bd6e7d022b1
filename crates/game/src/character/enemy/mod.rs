pub mod ability;
pub mod ai;

use bevy::prelude::*;
use tracing::warn;

use crate::{
    character::{health::{DeathSubscribers, Health}, Dormant, Facing, Position},
    services::PathFollower,
};

use self::{
    ability::{execution::ActiveAbility, EnemyAbilities},
    ai::{look::LookAt, state::MonsterState},
};

#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct Enemy {
    /// Index of the archetype this shell was pre-spawned for
    pub archetype: usize,
    pub level: u32,
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnemyTarget(pub Option<Entity>);

/// Suspends the actor's own loop (ability selection, chase) and its path
/// follower while an ability drives it.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementLock {
    locked: bool,
}

impl MovementLock {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self, agent: Entity, path: &mut dyn PathFollower) {
        if self.locked {
            warn!("movement of {:?} locked twice", agent);
            return;
        }
        self.locked = true;
        path.disable(agent);
    }

    pub fn unlock(&mut self, agent: Entity, path: &mut dyn PathFollower) {
        if !self.locked {
            warn!("movement of {:?} unlocked while not locked", agent);
            return;
        }
        self.locked = false;
        path.enable(agent);
    }
}

/// Components of a pooled enemy shell before any spawner configures it.
pub fn enemy_shell(archetype: usize, health: i32) -> impl Bundle {
    (
        Enemy { archetype, level: 0 },
        Health::new(health),
        Position::default(),
        Facing::default(),
        EnemyAbilities::default(),
        EnemyTarget::default(),
        MovementLock::default(),
        MonsterState::Idle,
        DeathSubscribers::default(),
        Dormant,
    )
}

/// Returns a live enemy to its dormant state: drops the running ability and
/// its transients, the pending reorientation and path following.
pub fn deactivate_enemy(
    commands: &mut Commands,
    path: &mut dyn PathFollower,
    enemy: Entity,
    active: Option<&ActiveAbility>,
) {
    if let Some(active) = active {
        for transient in &active.transients {
            commands.entity(*transient).try_despawn();
        }
    }
    path.disable(enemy);
    commands
        .entity(enemy)
        .remove::<(ActiveAbility, LookAt)>()
        .insert((Dormant, MonsterState::Idle));
}
