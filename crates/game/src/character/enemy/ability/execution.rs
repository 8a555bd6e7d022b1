//! Running abilities.
//!
//! Every running ability is an [`ActiveAbility`] component holding a resumable
//! [`Procedure`], advanced once per tick by the clock delta. Removing the
//! component (and despawning its transients) is all it takes to cancel one.

use bevy::{ecs::system::SystemParam, prelude::*};
use tracing::{debug, trace, warn};
use utils::frame::SimClock;

use crate::{
    area_damage::{spawn_zone, AreaDamageZone},
    character::{
        enemy::{ai::state::MonsterState, Enemy, EnemyTarget, MovementLock},
        health::{Damageable, Health},
        yaw_towards, Dormant, Facing, Position,
    },
    projectile::{spawn_projectile, Projectile},
    services::{AnimationService, NavMesh, NavMeshService, PathService},
};

use super::{AbilityInstance, AbilityKind, EnemyAbilities};

pub const CUE_ATTACK: &str = "Attack";
pub const CUE_JUMP: &str = "Jump";
pub const CUE_LANDED: &str = "Landed";
pub const FLAG_WALKING: &str = "IsWalking";

/// How far from the target a leap may settle.
const LANDING_SAMPLE_RADIUS: f32 = 1.0;
/// Lifetime of a projectile as a multiple of its time to cover the range.
const PROJECTILE_LIFE_FACTOR: f32 = 2.0;

#[derive(SystemParam)]
pub struct AbilityServices<'w> {
    pub path: ResMut<'w, PathService>,
    pub cues: ResMut<'w, AnimationService>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreathPhase {
    Turning { from: Quat, progress: f32 },
    Channeling { elapsed: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Procedure {
    Breath(BreathPhase),
    Volley { fired: u32, wait: f32 },
    Leap {
        start: Vec3,
        landing: Vec3,
        from: Quat,
        progress: f32,
    },
    GasCloud { elapsed: f32 },
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct ActiveAbility {
    /// Index into the actor's [`EnemyAbilities`]
    pub slot: usize,
    pub procedure: Procedure,
    /// Zones owned by this run, despawned when it ends
    pub transients: Vec<Entity>,
}

/// Mutable view of the actor running an ability.
pub struct ActorMut<'a> {
    pub entity: Entity,
    pub position: &'a mut Position,
    pub facing: &'a mut Facing,
    pub lock: &'a mut MovementLock,
    pub state: &'a mut MonsterState,
}

/// Live target of the running ability.
#[derive(Debug, Clone, Copy)]
pub struct TargetView {
    pub entity: Entity,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Running,
    Finished,
    Cancelled,
}

/// Marks `instance` as activating and performs the entry actions of its kind.
/// The caller inserts the returned component on the actor.
pub fn begin_ability(
    commands: &mut Commands,
    services: &mut AbilityServices,
    actor: &mut ActorMut,
    instance: &mut AbilityInstance,
    slot: usize,
    target: TargetView,
) -> ActiveAbility {
    instance.begin();
    let mut transients = Vec::new();

    let procedure = match &instance.kind {
        AbilityKind::Breath { .. } => {
            services.cues.0.set_bool(actor.entity, FLAG_WALKING, false);
            actor.lock.lock(actor.entity, services.path.0.as_mut());
            *actor.state = MonsterState::UsingAbility;
            Procedure::Breath(BreathPhase::Turning {
                from: actor.facing.0,
                progress: 0.0,
            })
        }
        AbilityKind::Volley { .. } => Procedure::Volley { fired: 0, wait: 0.0 },
        AbilityKind::Leap { .. } => {
            actor.lock.lock(actor.entity, services.path.0.as_mut());
            *actor.state = MonsterState::UsingAbility;
            services.cues.0.trigger(actor.entity, CUE_JUMP);
            Procedure::Leap {
                start: actor.position.0,
                landing: target.position,
                from: actor.facing.0,
                progress: 0.0,
            }
        }
        AbilityKind::GasCloud {
            tick_rate, radius, ..
        } => {
            let zone = AreaDamageZone::new(instance.damage, *tick_rate, *radius);
            transients.push(spawn_zone(commands, actor.entity, zone, target.position, None));
            Procedure::GasCloud { elapsed: 0.0 }
        }
    };

    debug!(
        "ability{{actor={:?} name={} kind={} begin}}",
        actor.entity,
        instance.name,
        instance.kind.label()
    );

    ActiveAbility {
        slot,
        procedure,
        transients,
    }
}

/// Advances every running ability by one tick.
pub fn ability_execution_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut services: AbilityServices,
    navmesh: Res<NavMeshService>,
    mut actors: Query<
        (
            Entity,
            &mut ActiveAbility,
            &mut EnemyAbilities,
            &mut Position,
            &mut Facing,
            &mut MovementLock,
            &mut MonsterState,
            &EnemyTarget,
        ),
        (With<Enemy>, Without<Dormant>),
    >,
    targets: Query<(&Position, &Health), (Without<Enemy>, Without<Dormant>)>,
) {
    let now = clock.now();

    for (entity, mut active, mut abilities, mut position, mut facing, mut lock, mut state, target) in actors.iter_mut()
    {
        let slot = active.slot;
        let Some(instance) = abilities.0.get_mut(slot) else {
            warn!("running ability slot {} missing on {:?}", slot, entity);
            commands.entity(entity).remove::<ActiveAbility>();
            continue;
        };

        let target = target.0.and_then(|t| {
            targets
                .get(t)
                .ok()
                .filter(|(_, health)| health.is_alive())
                .map(|(p, _)| TargetView { entity: t, position: p.0 })
        });

        let mut actor = ActorMut {
            entity,
            position: &mut position,
            facing: &mut facing,
            lock: &mut lock,
            state: &mut state,
        };

        let step = advance(
            &mut commands,
            &mut services,
            navmesh.0.as_ref(),
            &mut actor,
            &mut active,
            instance,
            target,
            clock.delta,
        );

        if step != Step::Running {
            if step == Step::Cancelled {
                debug!("ability{{actor={:?} name={} cancelled}}", entity, instance.name);
            }
            wrap_up(&mut commands, &mut services, &mut actor, &active, instance, now);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn advance(
    commands: &mut Commands,
    services: &mut AbilityServices,
    navmesh: &dyn NavMesh,
    actor: &mut ActorMut,
    active: &mut ActiveAbility,
    instance: &AbilityInstance,
    target: Option<TargetView>,
    dt: f32,
) -> Step {
    match (&mut active.procedure, &instance.kind) {
        (
            Procedure::Breath(phase),
            AbilityKind::Breath {
                duration,
                tick_rate,
                turn_speed,
                zone_radius,
                ..
            },
        ) => {
            let Some(target) = target else {
                return Step::Cancelled;
            };
            let desired = yaw_towards(actor.position.0, target.position).unwrap_or(actor.facing.0);
            match phase {
                BreathPhase::Turning { from, progress } => {
                    *progress += dt * turn_speed;
                    if *progress < 1.0 {
                        actor.facing.0 = from.slerp(desired, *progress);
                        return Step::Running;
                    }
                    actor.facing.0 = desired;
                    let zone = AreaDamageZone::new(instance.damage, *tick_rate, *zone_radius);
                    let offset = Vec3::Y;
                    let at = actor.position.0 + actor.facing.0 * offset;
                    active
                        .transients
                        .push(spawn_zone(commands, actor.entity, zone, at, Some(offset)));
                    *phase = BreathPhase::Channeling { elapsed: 0.0 };
                    Step::Running
                }
                BreathPhase::Channeling { elapsed } => {
                    *elapsed += dt;
                    actor.facing.0 = desired;
                    if *elapsed >= *duration {
                        Step::Finished
                    } else {
                        Step::Running
                    }
                }
            }
        }
        (
            Procedure::Volley { fired, wait },
            AbilityKind::Volley {
                range,
                shots,
                delay,
                projectile_speed,
                projectile_radius,
                spawn_offset,
            },
        ) => {
            let Some(target) = target else {
                return Step::Cancelled;
            };
            *wait -= dt;
            if *wait > 0.0 {
                return Step::Running;
            }
            if *fired >= *shots {
                return Step::Finished;
            }

            services.cues.0.trigger(actor.entity, CUE_ATTACK);
            let projectile = Projectile {
                direction: actor.facing.forward(),
                speed: *projectile_speed,
                damage: instance.damage,
                target: target.entity,
                radius: *projectile_radius,
                remaining_life: range / projectile_speed * PROJECTILE_LIFE_FACTOR,
            };
            let at = actor.position.0 + Vec3::from_array(*spawn_offset);
            spawn_projectile(commands, actor.entity, projectile, at);
            trace!("volley{{actor={:?} shot={}/{}}}", actor.entity, *fired + 1, shots);

            *fired += 1;
            *wait = *delay;
            Step::Running
        }
        (
            Procedure::Leap {
                start,
                landing,
                from,
                progress,
            },
            AbilityKind::Leap { speed, height, .. },
        ) => {
            *progress += dt * speed;
            let t = progress.min(1.0);
            let ground = start.lerp(*landing, t);

            let Some(target) = target else {
                actor.position.0 = ground;
                services.path.0.warp_to(actor.entity, ground);
                return Step::Cancelled;
            };

            actor.position.0 = ground + Vec3::Y * height.evaluate(t);
            if let Some(desired) = yaw_towards(*start, *landing) {
                actor.facing.0 = from.slerp(desired, t);
            }
            if *progress < 1.0 {
                return Step::Running;
            }

            services.cues.0.trigger(actor.entity, CUE_LANDED);
            let settled = navmesh
                .sample_walkable_point(target.position, LANDING_SAMPLE_RADIUS)
                .unwrap_or(*landing);
            actor.position.0 = settled;
            services.path.0.warp_to(actor.entity, settled);
            Step::Finished
        }
        (Procedure::GasCloud { elapsed }, AbilityKind::GasCloud { duration, .. }) => {
            *elapsed += dt;
            if *elapsed >= *duration {
                Step::Finished
            } else {
                Step::Running
            }
        }
        _ => {
            warn!(
                "procedure does not match {} ability {} on {:?}",
                instance.kind.label(),
                instance.name,
                actor.entity
            );
            Step::Cancelled
        }
    }
}

/// Common exit of a run: transients gone, movement back, use time recorded,
/// activation released.
fn wrap_up(
    commands: &mut Commands,
    services: &mut AbilityServices,
    actor: &mut ActorMut,
    active: &ActiveAbility,
    instance: &mut AbilityInstance,
    now: f32,
) {
    for transient in &active.transients {
        commands.entity(*transient).try_despawn();
    }
    if actor.lock.is_locked() {
        actor.lock.unlock(actor.entity, services.path.0.as_mut());
    }
    if matches!(instance.kind, AbilityKind::Breath { .. }) {
        services.cues.0.set_bool(actor.entity, FLAG_WALKING, true);
    }
    if *actor.state == MonsterState::UsingAbility {
        *actor.state = MonsterState::Chase;
    }
    instance.finish(now);
    commands.entity(actor.entity).remove::<ActiveAbility>();

    debug!("ability{{actor={:?} name={} done t={:.2}}}", actor.entity, instance.name, now);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        character::enemy::{ai::enemy_ability_selection_system, ability::AbilityDefinition},
        scaling::AbilityScaling,
        services::{AnimationCues, CueLog, SightService},
    };

    /// Cue recorder the test keeps a handle on.
    #[derive(Clone, Default)]
    struct SharedCues(Arc<Mutex<CueLog>>);

    impl AnimationCues for SharedCues {
        fn trigger(&mut self, agent: Entity, cue: &str) {
            self.0.lock().unwrap().trigger(agent, cue);
        }

        fn set_bool(&mut self, agent: Entity, flag: &str, value: bool) {
            self.0.lock().unwrap().set_bool(agent, flag, value);
        }
    }

    struct Scene {
        app: App,
        cues: SharedCues,
        actor: Entity,
        target: Entity,
    }

    impl Scene {
        fn new(step: f32, level: u32, ability: AbilityDefinition, target_at: Vec3) -> Self {
            let cues = SharedCues::default();
            let mut app = App::new();
            app.insert_resource(SimClock {
                elapsed: 100.0,
                ..SimClock::with_step(step)
            })
            .insert_resource(AnimationService(Box::new(cues.clone())))
            .init_resource::<PathService>()
            .init_resource::<NavMeshService>()
            .init_resource::<SightService>()
            .add_systems(
                Update,
                (
                    utils::frame::advance_sim_clock_system,
                    enemy_ability_selection_system,
                    ability_execution_system,
                )
                    .chain(),
            );

            let target = app.world_mut().spawn((Health::new(100), Position(target_at))).id();
            let actor = app
                .world_mut()
                .spawn((
                    Enemy { archetype: 0, level },
                    EnemyAbilities(vec![ability.scale_for_level(&AbilityScaling::default(), level)]),
                    Health::new(10),
                    Position::default(),
                    Facing::default(),
                    MovementLock::default(),
                    MonsterState::Chase,
                    EnemyTarget(Some(target)),
                ))
                .id();

            Self {
                app,
                cues,
                actor,
                target,
            }
        }

        fn run(&mut self, ticks: usize) {
            for _ in 0..ticks {
                self.app.update();
            }
        }

        fn running(&self) -> bool {
            self.app.world().get::<ActiveAbility>(self.actor).is_some()
        }

        fn instance(&self) -> AbilityInstance {
            self.app.world().get::<EnemyAbilities>(self.actor).unwrap().0[0].clone()
        }

        fn locked(&self) -> bool {
            self.app.world().get::<MovementLock>(self.actor).unwrap().is_locked()
        }

        fn state(&self) -> MonsterState {
            *self.app.world().get::<MonsterState>(self.actor).unwrap()
        }

        fn position(&self) -> Vec3 {
            self.app.world().get::<Position>(self.actor).unwrap().0
        }

        fn count<C: Component>(&mut self) -> usize {
            let world = self.app.world_mut();
            world.query::<&C>().iter(world).count()
        }

        fn cue_count(&self, cue: &str) -> usize {
            let log = self.cues.0.lock().unwrap();
            log.triggers.iter().filter(|(a, c)| *a == self.actor && c == cue).count()
        }

        fn flag(&self, flag: &str) -> Option<bool> {
            let log = self.cues.0.lock().unwrap();
            log.flags.get(&(self.actor, flag.to_string())).copied()
        }

        fn kill_target(&mut self) {
            self.app.world_mut().get_mut::<Health>(self.target).unwrap().current = 0;
        }
    }

    #[test]
    fn volley_fires_every_shot_then_releases() {
        let mut scene = Scene::new(0.05, 1, AbilityDefinition::ice_lance(), Vec3::new(0.0, 0.0, 8.0));

        scene.run(3);
        assert!(scene.running());
        assert!(scene.instance().activating);
        assert_eq!(scene.count::<Projectile>(), 1);
        assert!(!scene.locked());

        scene.run(17);
        assert!(!scene.running());
        assert_eq!(scene.count::<Projectile>(), 2);
        assert_eq!(scene.cue_count(CUE_ATTACK), 2);
        let lance = scene.instance();
        assert!(!lance.activating);
        assert!(lance.last_use > 100.0);
    }

    #[test]
    fn cooldown_blocks_reuse_right_after_a_run() {
        let mut scene = Scene::new(0.05, 1, AbilityDefinition::ice_lance(), Vec3::new(0.0, 0.0, 8.0));
        scene.run(20);
        let last_use = scene.instance().last_use;

        scene.run(40);
        assert!(!scene.running());
        assert_eq!(scene.count::<Projectile>(), 2);
        assert_eq!(scene.instance().last_use, last_use);
    }

    #[test]
    fn leap_arcs_lands_and_frees_the_actor() {
        let mut scene = Scene::new(0.1, 2, AbilityDefinition::jump(), Vec3::new(0.0, 0.0, 3.0));

        scene.run(5);
        assert!(scene.running());
        assert!(scene.locked());
        assert_eq!(scene.state(), MonsterState::UsingAbility);
        assert!(scene.position().y > 0.5);
        assert_eq!(scene.cue_count(CUE_JUMP), 1);

        scene.run(10);
        assert!(!scene.running());
        assert!(!scene.locked());
        assert_eq!(scene.state(), MonsterState::Chase);
        assert!((scene.position() - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-4);
        assert_eq!(scene.cue_count(CUE_LANDED), 1);
        assert!(scene.instance().last_use > 100.0);
    }

    #[test]
    fn breath_channels_then_restores_movement() {
        let mut scene = Scene::new(0.25, 1, AbilityDefinition::breath(), Vec3::new(0.0, 0.0, 2.0));

        scene.run(3);
        assert!(scene.running());
        assert!(scene.locked());
        assert_eq!(scene.flag(FLAG_WALKING), Some(false));
        assert_eq!(scene.count::<AreaDamageZone>(), 1);

        scene.run(17);
        assert!(!scene.running());
        assert!(!scene.locked());
        assert_eq!(scene.state(), MonsterState::Chase);
        assert_eq!(scene.flag(FLAG_WALKING), Some(true));
        assert_eq!(scene.count::<AreaDamageZone>(), 0);
        let breath = scene.instance();
        assert!(!breath.activating);
        assert!(breath.last_use > 100.0);
    }

    #[test]
    fn breath_is_cancelled_when_the_target_dies() {
        let mut scene = Scene::new(0.25, 1, AbilityDefinition::breath(), Vec3::new(0.0, 0.0, 2.0));
        scene.run(3);
        assert_eq!(scene.count::<AreaDamageZone>(), 1);

        scene.kill_target();
        scene.run(1);
        assert!(!scene.running());
        assert!(!scene.locked());
        assert_ne!(scene.state(), MonsterState::UsingAbility);
        assert_eq!(scene.count::<AreaDamageZone>(), 0);
        assert!(!scene.instance().activating);
    }

    #[test]
    fn volley_stops_firing_when_the_target_dies() {
        let mut scene = Scene::new(0.05, 1, AbilityDefinition::ice_lance(), Vec3::new(0.0, 0.0, 8.0));
        scene.run(2);
        assert_eq!(scene.count::<Projectile>(), 1);

        scene.kill_target();
        scene.run(10);
        assert!(!scene.running());
        assert_eq!(scene.count::<Projectile>(), 1);
        assert!(!scene.instance().activating);
    }

    #[test]
    fn leap_drops_to_the_ground_when_the_target_dies() {
        let mut scene = Scene::new(0.1, 2, AbilityDefinition::jump(), Vec3::new(0.0, 0.0, 3.0));
        scene.run(4);
        assert!(scene.position().y > 0.5);

        scene.kill_target();
        scene.run(1);
        assert!(!scene.running());
        assert!(!scene.locked());
        assert_eq!(scene.state(), MonsterState::Chase);
        assert_eq!(scene.position().y, 0.0);
        assert_eq!(scene.cue_count(CUE_LANDED), 0);
    }
}
