use bevy::prelude::*;
use game::{
    area_damage::BuiltinTriggers,
    args::{get_args, BaseArgsPlugin},
    character::{
        enemy::Enemy,
        health::{DamageMessage, Damageable, Health},
        Dormant, Facing, Position,
    },
    system_set::EncounterSystemSet,
    waves::{spawn_spawner, SpawnerConfig, WaveDiagnostics, WaveState},
    EncounterPlugin,
};
use tracing::{info, warn};
use utils::{frame::SimClock, logs::setup_logging};

/// Stand-in player the enemies hunt. Hits the closest enemy in reach.
#[derive(Component)]
struct Champion {
    damage: i32,
    reach: f32,
    cooldown: f32,
    ready_in: f32,
}

fn champion_attack_system(
    clock: Res<SimClock>,
    mut champions: Query<(Entity, &Position, &Health, &mut Champion)>,
    enemies: Query<(Entity, &Position), (With<Enemy>, Without<Dormant>)>,
    mut damage_writer: MessageWriter<DamageMessage>,
) {
    for (champion_entity, position, health, mut champion) in champions.iter_mut() {
        if !health.is_alive() {
            continue;
        }
        champion.ready_in -= clock.delta;
        if champion.ready_in > 0.0 {
            continue;
        }

        let closest = enemies
            .iter()
            .map(|(entity, enemy_position)| (entity, enemy_position.0.distance(position.0)))
            .filter(|(_, distance)| *distance <= champion.reach)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((target, _)) = closest {
            damage_writer.write(DamageMessage {
                target,
                amount: champion.damage,
                source: Some(champion_entity),
            });
            champion.ready_in = champion.cooldown;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = get_args();

    let _logging_guard = setup_logging(args.log_suffix.clone())?;

    let config = args.spawner_config()?;

    let mut app = App::new();
    app.add_plugins(BaseArgsPlugin(args.clone()))
        .add_plugins(EncounterPlugin)
        .insert_resource(BuiltinTriggers)
        .add_systems(Update, champion_attack_system.in_set(EncounterSystemSet::EnemyAI));

    let champion = app
        .world_mut()
        .spawn((
            Champion {
                damage: 10,
                reach: 4.0,
                cooldown: 0.4,
                ready_in: 0.0,
            },
            Health::new(600),
            Position(Vec3::ZERO),
            Facing::default(),
        ))
        .id();

    let spawner = {
        let mut commands = app.world_mut().commands();
        spawn_spawner(&mut commands, config, Some(champion))?
    };
    app.world_mut().flush();

    info!(
        "harness{{seed={} frames={} step={} waves={}}}",
        args.seed, args.frames, args.step, args.waves
    );

    for _ in 0..args.frames {
        app.update();

        let world = app.world();
        if world.get::<WaveState>(spawner).is_some_and(|s| s.waves_cleared >= args.waves) {
            break;
        }
        if !world.get::<Health>(champion).is_some_and(|h| h.is_alive()) {
            warn!("champion fell at {}", world.resource::<SimClock>());
            break;
        }
    }

    let world = app.world();
    let state = world.get::<WaveState>(spawner).ok_or("spawner vanished")?;
    let config = world.get::<SpawnerConfig>(spawner).ok_or("spawner lost its config")?;
    info!("harness done at {}", world.resource::<SimClock>());
    println!("{}", WaveDiagnostics::capture(spawner, config, state).to_json()?);

    Ok(())
}
