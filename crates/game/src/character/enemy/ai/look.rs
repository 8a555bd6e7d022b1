//! Turning toward an attacker.

use bevy::prelude::*;
use tracing::trace;
use utils::frame::SimClock;

use crate::{
    character::{
        enemy::{ability::execution::CUE_ATTACK, Enemy},
        health::AttackReaction,
        yaw_towards, Dormant, Facing, Position,
    },
    services::AnimationService,
};

/// Rate of the reorientation, full turn after half a second.
pub const LOOK_SPEED: f32 = 2.0;

/// Yaw-only reorientation in progress. Inserting a new one replaces it.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LookAt {
    pub from: Quat,
    pub toward: Quat,
    pub progress: f32,
}

pub fn attack_reaction_system(
    mut commands: Commands,
    mut reaction_reader: MessageReader<AttackReaction>,
    mut cues: ResMut<AnimationService>,
    enemies: Query<(&Position, &Facing), (With<Enemy>, Without<Dormant>)>,
    attackers: Query<&Position>,
) {
    for reaction in reaction_reader.read() {
        let Ok((position, facing)) = enemies.get(reaction.enemy) else {
            continue;
        };
        cues.0.trigger(reaction.enemy, CUE_ATTACK);

        let Some(toward) = attackers
            .get(reaction.attacker)
            .ok()
            .and_then(|attacker| yaw_towards(position.0, attacker.0))
        else {
            continue;
        };
        trace!("look{{enemy={:?} attacker={:?}}}", reaction.enemy, reaction.attacker);
        commands.entity(reaction.enemy).insert(LookAt {
            from: facing.0,
            toward,
            progress: 0.0,
        });
    }
}

pub fn look_at_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut query: Query<(Entity, &mut LookAt, &mut Facing), Without<Dormant>>,
) {
    for (entity, mut look, mut facing) in query.iter_mut() {
        look.progress += clock.delta * LOOK_SPEED;
        if look.progress >= 1.0 {
            facing.0 = look.toward;
            commands.entity(entity).remove::<LookAt>();
        } else {
            facing.0 = look.from.slerp(look.toward, look.progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_turns_enemy_toward_attacker() {
        let mut app = App::new();
        app.insert_resource(SimClock::with_step(0.1))
            .init_resource::<AnimationService>()
            .add_message::<AttackReaction>()
            .add_systems(
                Update,
                (
                    utils::frame::advance_sim_clock_system,
                    attack_reaction_system,
                    look_at_system,
                )
                    .chain(),
            );

        let enemy = app
            .world_mut()
            .spawn((Enemy::default(), Position::default(), Facing::default()))
            .id();
        let attacker = app.world_mut().spawn(Position(Vec3::new(4.0, 0.0, 0.0))).id();
        app.world_mut()
            .resource_mut::<Messages<AttackReaction>>()
            .write(AttackReaction { enemy, attacker });

        app.update();
        assert!(app.world().get::<LookAt>(enemy).is_some());

        for _ in 0..5 {
            app.update();
        }
        assert!(app.world().get::<LookAt>(enemy).is_none());
        let forward = app.world().get::<Facing>(enemy).unwrap().forward();
        assert!((forward - Vec3::X).length() < 1e-4);
    }
}
