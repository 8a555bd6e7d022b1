use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utils::frame::SimClock;

use crate::{
    character::{
        enemy::{ability::execution::ActiveAbility, deactivate_enemy, Enemy},
        Dormant,
    },
    services::PathService,
};

/// Anything that can lose health.
pub trait Damageable {
    fn take_damage(&mut self, amount: i32) -> DamageOutcome;
    fn is_alive(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Already dead or nothing to apply
    Ignored,
    Wounded,
    Killed,
}

#[derive(Component, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }
}

impl Damageable for Health {
    fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.is_alive() || amount <= 0 {
            return DamageOutcome::Ignored;
        }
        self.current -= amount;
        if self.current <= 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }

    fn is_alive(&self) -> bool {
        self.current > 0
    }
}

/// Inserted on whatever the last hit killed.
#[derive(Component, Clone, Debug, Default)]
pub struct Death {
    pub last_hit_by: Option<Entity>,
}

/// Entities told once, through [`Died`], when this one dies.
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeathSubscribers(pub Vec<Entity>);

impl DeathSubscribers {
    pub fn subscribe(&mut self, subscriber: Entity) {
        if !self.0.contains(&subscriber) {
            self.0.push(subscriber);
        }
    }

    pub fn unsubscribe(&mut self, subscriber: Entity) {
        self.0.retain(|s| *s != subscriber);
    }
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageMessage {
    pub target: Entity,
    pub amount: i32,
    pub source: Option<Entity>,
}

/// One per subscriber of the dead entity.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Died {
    pub entity: Entity,
    pub subscriber: Entity,
}

/// An enemy was hit by `attacker` and should turn toward it.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackReaction {
    pub enemy: Entity,
    pub attacker: Entity,
}

/// Applies queued damage, then fans out death notifications and returns dead
/// enemies to their dormant state.
pub fn apply_damage_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    mut path: ResMut<PathService>,
    mut damage_reader: MessageReader<DamageMessage>,
    mut died_writer: MessageWriter<Died>,
    mut reaction_writer: MessageWriter<AttackReaction>,
    mut query: Query<
        (
            &mut Health,
            Option<&mut DeathSubscribers>,
            Option<&ActiveAbility>,
            Has<Enemy>,
        ),
        Without<Dormant>,
    >,
) {
    for damage in damage_reader.read() {
        let Ok((mut health, subscribers, active, is_enemy)) = query.get_mut(damage.target) else {
            debug!("damage for {:?} dropped, not a live damageable", damage.target);
            continue;
        };

        match health.take_damage(damage.amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Wounded => {
                if let (true, Some(attacker)) = (is_enemy, damage.source) {
                    reaction_writer.write(AttackReaction {
                        enemy: damage.target,
                        attacker,
                    });
                }
            }
            DamageOutcome::Killed => {
                info!(
                    "death{{f={} entity={:?} by={:?}}}",
                    clock.frame, damage.target, damage.source
                );

                if let Some(mut subscribers) = subscribers {
                    for subscriber in subscribers.0.drain(..) {
                        died_writer.write(Died {
                            entity: damage.target,
                            subscriber,
                        });
                    }
                }

                commands.entity(damage.target).insert(Death {
                    last_hit_by: damage.source,
                });

                if is_enemy {
                    deactivate_enemy(&mut commands, path.0.as_mut(), damage.target, active);
                }
            }
        }
    }
}
