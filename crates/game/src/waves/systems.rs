//! Wave spawning systems.

use bevy::{ecs::system::SystemParam, prelude::*};
use rand::Rng;
use tracing::{debug, error, info, warn};
use utils::{frame::SimClock, rng::SimRng};

use crate::{
    character::{
        enemy::{
            ability::{execution::ActiveAbility, AbilityInstance, EnemyAbilities},
            ai::state::MonsterState,
            deactivate_enemy, enemy_shell, Enemy, EnemyTarget, MovementLock,
        },
        health::{Death, DeathSubscribers, Died, Health},
        Dormant, Facing, Position,
    },
    error::{ConfigError, SpawnError},
    services::{DormantPool, EnemyPool, EnemyPoolHandle, NavMesh, NavMeshService, PathFollower, PathService},
};

use super::{
    config::{FailedSpawnPolicy, SpawnerConfig},
    state::{WavePhase, WaveState},
    tracking::{HostileTarget, PendingAutoStart, WaveEnemy},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveCommand {
    /// Start the next wave if the spawner is idle
    Start,
    /// Return every live enemy to the pool silently and go back to wave 0
    Reset,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveControl {
    pub spawner: Entity,
    pub command: WaveCommand,
}

#[derive(Message, Debug, Clone, PartialEq)]
pub struct SpawnFailed {
    pub spawner: Entity,
    pub error: SpawnError,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveCleared {
    pub spawner: Entity,
    pub level: u32,
}

/// Bundled services for enemy placement
#[derive(SystemParam)]
pub struct SpawnServices<'w> {
    pub navmesh: Res<'w, NavMeshService>,
    pub path: ResMut<'w, PathService>,
    pub rng: ResMut<'w, SimRng>,
}

/// Everything needed to bring one pooled shell to life.
pub struct Placement<'a> {
    pub spawner: Entity,
    pub archetype: usize,
    pub desired: Vec3,
    pub sample_radius: f32,
    pub level: u32,
    pub health: i32,
    pub abilities: &'a [AbilityInstance],
    pub target: Option<Entity>,
}

/// Spawns a spawner with its pool of dormant shells, `pool_size` per archetype.
/// Nothing is spawned when the config does not validate.
pub fn spawn_spawner(
    commands: &mut Commands,
    config: SpawnerConfig,
    target: Option<Entity>,
) -> Result<Entity, ConfigError> {
    config.validate()?;

    let mut pool = DormantPool::new(config.archetypes.len());
    for (index, archetype) in config.archetypes.iter().enumerate() {
        for _ in 0..config.pool_size {
            let shell = commands.spawn(enemy_shell(index, archetype.health)).id();
            pool.stock(index, shell);
        }
    }

    let auto_start = config.auto_start;
    let mut spawner = commands.spawn((WaveState::new(&config), EnemyPoolHandle(Box::new(pool)), config));
    if let Some(target) = target {
        spawner.insert(HostileTarget(target));
    }
    if auto_start {
        spawner.insert(PendingAutoStart);
    }
    Ok(spawner.id())
}

/// Takes an instance from the pool and drops it on the navmesh near
/// `desired`. On failure nothing is counted and the instance goes back.
pub fn place_enemy(
    commands: &mut Commands,
    navmesh: &dyn NavMesh,
    path: &mut dyn PathFollower,
    pool: &mut dyn EnemyPool,
    shells: &Query<&Enemy, With<Dormant>>,
    placement: Placement,
) -> Result<Entity, SpawnError> {
    let instance = pool
        .acquire(placement.archetype)
        .ok_or(SpawnError::PoolExhausted(placement.archetype))?;

    if !shells
        .get(instance)
        .is_ok_and(|enemy| enemy.archetype == placement.archetype)
    {
        return Err(SpawnError::StaleInstance(instance));
    }

    let Some(point) = navmesh.sample_walkable_point(placement.desired, placement.sample_radius) else {
        pool.release(instance);
        return Err(SpawnError::NoWalkablePoint {
            desired: placement.desired,
            radius: placement.sample_radius,
        });
    };

    path.warp_to(instance, point);
    path.enable(instance);

    commands.entity(instance).remove::<(Dormant, Death)>().insert((
        Enemy {
            archetype: placement.archetype,
            level: placement.level,
        },
        Health::new(placement.health),
        Position(point),
        Facing::default(),
        EnemyAbilities(placement.abilities.to_vec()),
        EnemyTarget(placement.target),
        MovementLock::default(),
        MonsterState::Chase,
        DeathSubscribers(vec![placement.spawner]),
        WaveEnemy {
            spawner: placement.spawner,
            wave: placement.level,
        },
    ));

    Ok(instance)
}

fn begin_wave(frame: u32, spawner: Entity, config: &SpawnerConfig, state: &mut WaveState, rng: &mut SimRng) {
    match state.start_wave(config, rng) {
        Ok(()) => info!(
            "wave{{f={} spawner={:?} phase=Spawning level={} count={} interval={:.2}}}",
            frame, spawner, state.level, state.spawn_count, state.spawn_interval
        ),
        Err(err) => {
            error!("wave{{f={} spawner={:?}}} cannot start: {}", frame, spawner, err);
            state.phase = WavePhase::Idle;
        }
    }
}

fn finish_wave(
    frame: u32,
    spawner: Entity,
    config: &SpawnerConfig,
    state: &mut WaveState,
    rng: &mut SimRng,
    cleared_writer: &mut MessageWriter<WaveCleared>,
) {
    state.phase = WavePhase::WaveCleared;
    state.waves_cleared += 1;
    info!(
        "wave{{f={} spawner={:?} phase=WaveCleared level={} kills={}}}",
        frame, spawner, state.level, state.total_kills
    );
    cleared_writer.write(WaveCleared {
        spawner,
        level: state.level,
    });

    state.scale_up(config);
    if config.continuous {
        begin_wave(frame, spawner, config, state, rng);
    } else {
        state.phase = WavePhase::Idle;
        info!("wave{{f={} spawner={:?} phase=Idle}}", frame, spawner);
    }
}

/// Auto start, then `Start` / `Reset` commands.
pub fn wave_control_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut rng: ResMut<SimRng>,
    mut path: ResMut<PathService>,
    mut control_reader: MessageReader<WaveControl>,
    mut spawners: Query<(Entity, &SpawnerConfig, &mut WaveState, &mut EnemyPoolHandle, Has<PendingAutoStart>)>,
    mut wave_enemies: Query<(Entity, &WaveEnemy, Option<&ActiveAbility>, &mut DeathSubscribers)>,
) {
    for (spawner, config, mut state, _, pending) in spawners.iter_mut() {
        if pending {
            commands.entity(spawner).remove::<PendingAutoStart>();
            if state.phase == WavePhase::Idle {
                begin_wave(clock.frame, spawner, config, &mut state, &mut rng);
            }
        }
    }

    for control in control_reader.read() {
        let Ok((spawner, config, mut state, mut pool, _)) = spawners.get_mut(control.spawner) else {
            debug!("wave control for unknown spawner {:?}", control.spawner);
            continue;
        };

        match control.command {
            WaveCommand::Start => {
                if matches!(state.phase, WavePhase::Idle | WavePhase::WaveCleared) {
                    begin_wave(clock.frame, spawner, config, &mut state, &mut rng);
                } else {
                    debug!("wave{{spawner={:?}}} start ignored in {:?}", spawner, state.phase);
                }
            }
            WaveCommand::Reset => {
                let mut released = 0;
                for (enemy, tracking, active, mut subscribers) in wave_enemies.iter_mut() {
                    if tracking.spawner != spawner {
                        continue;
                    }
                    subscribers.unsubscribe(spawner);
                    deactivate_enemy(&mut commands, path.0.as_mut(), enemy, active);
                    commands.entity(enemy).remove::<WaveEnemy>();
                    pool.0.release(enemy);
                    released += 1;
                }
                state.reset(config);
                info!(
                    "wave{{f={} spawner={:?} phase=Idle reset released={}}}",
                    clock.frame, spawner, released
                );
            }
        }
    }
}

/// Fills one slot per interval during the Spawning phase.
pub fn wave_spawning_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut services: SpawnServices,
    mut spawners: Query<(Entity, &SpawnerConfig, &mut WaveState, &mut EnemyPoolHandle, Option<&HostileTarget>)>,
    shells: Query<&Enemy, With<Dormant>>,
    mut failed_writer: MessageWriter<SpawnFailed>,
    mut cleared_writer: MessageWriter<WaveCleared>,
) {
    for (spawner, config, mut state, mut pool, target) in spawners.iter_mut() {
        if state.phase != WavePhase::Spawning {
            continue;
        }
        if state.spawned >= state.spawn_count {
            warn!(
                "wave{{f={} spawner={:?}}} nothing left to spawn ({}/{})",
                clock.frame, spawner, state.spawned, state.spawn_count
            );
            state.phase = WavePhase::WaveActive;
            if state.is_cleared() {
                finish_wave(clock.frame, spawner, config, &mut state, &mut services.rng, &mut cleared_writer);
            }
            continue;
        }
        state.spawn_timer -= clock.delta;
        if state.spawn_timer > 0.0 {
            continue;
        }
        state.spawn_timer = state.spawn_interval;

        let attempt = config
            .spawn_method
            .pick(state.spawned, &state.weights, &mut *services.rng)
            .and_then(|archetype| {
                let vertices = services.navmesh.0.triangulation();
                if vertices.is_empty() {
                    return Err(SpawnError::EmptyTriangulation);
                }
                let desired = vertices[services.rng.gen_range(0..vertices.len())];
                place_enemy(
                    &mut commands,
                    services.navmesh.0.as_ref(),
                    services.path.0.as_mut(),
                    pool.0.as_mut(),
                    &shells,
                    Placement {
                        spawner,
                        archetype,
                        desired,
                        sample_radius: config.sample_radius,
                        level: state.level,
                        health: config.archetypes[archetype].health,
                        abilities: &state.templates[archetype],
                        target: target.map(|t| t.0),
                    },
                )
            });

        match attempt {
            Ok(enemy) => {
                state.record_spawn();
                info!(
                    "wave{{f={} spawner={:?} spawned={:?} slot={}/{} alive={}}}",
                    clock.frame, spawner, enemy, state.spawned, state.spawn_count, state.alive
                );
            }
            Err(err) => {
                error!("wave{{f={} spawner={:?}}} spawn failed: {}", clock.frame, spawner, err);
                failed_writer.write(SpawnFailed {
                    spawner,
                    error: err.clone(),
                });
                if err.is_fatal_for_spawner() {
                    state.phase = WavePhase::Idle;
                    continue;
                }
                let skip = config.failed_spawn_policy == FailedSpawnPolicy::Skip;
                if state.record_failure(skip, config.max_slot_retries) {
                    debug!("wave{{spawner={:?}}} slot skipped, target now {}", spawner, state.spawn_count);
                }
                if state.is_cleared() {
                    finish_wave(clock.frame, spawner, config, &mut state, &mut services.rng, &mut cleared_writer);
                }
            }
        }
    }
}

/// Handles [`Died`] notifications addressed to spawners.
pub fn wave_enemy_death_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut rng: ResMut<SimRng>,
    mut died_reader: MessageReader<Died>,
    mut spawners: Query<(&SpawnerConfig, &mut WaveState, &mut EnemyPoolHandle)>,
    wave_enemies: Query<&WaveEnemy>,
    mut cleared_writer: MessageWriter<WaveCleared>,
) {
    for died in died_reader.read() {
        if !wave_enemies
            .get(died.entity)
            .is_ok_and(|tracking| tracking.spawner == died.subscriber)
        {
            continue;
        }
        let Ok((config, mut state, mut pool)) = spawners.get_mut(died.subscriber) else {
            continue;
        };

        commands.entity(died.entity).remove::<WaveEnemy>();
        pool.0.release(died.entity);

        if state.record_death() {
            finish_wave(clock.frame, died.subscriber, config, &mut state, &mut rng, &mut cleared_writer);
        }
    }
}
