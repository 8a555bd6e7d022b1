//! Area damage zones.
//!
//! A zone damages at most one occupant: the first damageable that entered it.
//! Anything else overlapping is ignored until that occupant leaves, there is
//! no queue. Damage lands on entry and then once every `tick_interval` while
//! the occupant stays.
//!
//! Contacts come in as [`ZoneContact`] messages. A host with its own physics
//! writes them itself; otherwise [`BuiltinTriggers`] derives them from ground
//! plane overlap every tick.

use std::collections::HashSet;

use bevy::prelude::*;
use tracing::trace;

use crate::character::{
    enemy::Enemy,
    flat_distance,
    health::{DamageMessage, Damageable, Health},
    Dormant, Facing, Position, SpawnedBy,
};

#[derive(Component, Debug, Clone, PartialEq)]
pub struct AreaDamageZone {
    pub damage: i32,
    pub tick_interval: f32,
    pub radius: f32,
    occupant: Option<Entity>,
    until_next_tick: f32,
}

impl AreaDamageZone {
    pub fn new(damage: i32, tick_interval: f32, radius: f32) -> Self {
        Self {
            damage,
            tick_interval,
            radius,
            occupant: None,
            until_next_tick: 0.0,
        }
    }

    pub fn occupant(&self) -> Option<Entity> {
        self.occupant
    }

    /// Claims the zone for `other` if it is empty. Returns whether `other`
    /// is now the occupant.
    pub fn on_enter(&mut self, other: Entity) -> bool {
        match self.occupant {
            None => {
                self.occupant = Some(other);
                self.until_next_tick = 0.0;
                true
            }
            Some(current) => current == other,
        }
    }

    /// Releases the zone if `other` was its occupant.
    pub fn on_exit(&mut self, other: Entity) -> bool {
        if self.occupant == Some(other) {
            self.occupant = None;
            true
        } else {
            false
        }
    }

    /// Advances the cadence, returning the hit to deal this tick if any.
    pub fn tick(&mut self, dt: f32) -> Option<(Entity, i32)> {
        let occupant = self.occupant?;
        self.until_next_tick -= dt;
        if self.until_next_tick > 0.0 {
            return None;
        }
        self.until_next_tick += self.tick_interval;
        Some((occupant, self.damage))
    }
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneContact {
    Entered { zone: Entity, other: Entity },
    Exited { zone: Entity, other: Entity },
}

/// Keeps a zone at `offset` (in the owner's local frame) from its owner.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct AttachedTo {
    pub owner: Entity,
    pub offset: Vec3,
}

/// Enables the built-in overlap trigger provider.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct BuiltinTriggers;

/// Damageables the built-in provider currently sees inside a zone.
#[derive(Component, Debug, Clone, Default)]
pub struct ZoneContacts(pub HashSet<Entity>);

pub fn spawn_zone(
    commands: &mut Commands,
    owner: Entity,
    zone: AreaDamageZone,
    at: Vec3,
    attach_offset: Option<Vec3>,
) -> Entity {
    let mut entity = commands.spawn((zone, Position(at), SpawnedBy(owner), ZoneContacts::default()));
    if let Some(offset) = attach_offset {
        entity.insert(AttachedTo { owner, offset });
    }
    entity.id()
}

pub fn follow_owner_system(
    mut zones: Query<(&AttachedTo, &mut Position)>,
    owners: Query<(&Position, &Facing), Without<AttachedTo>>,
) {
    for (attached, mut position) in zones.iter_mut() {
        if let Ok((owner_position, facing)) = owners.get(attached.owner) {
            position.0 = owner_position.0 + facing.0 * attached.offset;
        }
    }
}

/// Sphere-on-the-ground overlap between zones and damageables.
pub fn builtin_trigger_system(
    mut zones: Query<(Entity, &AreaDamageZone, &Position, &mut ZoneContacts)>,
    damageables: Query<(Entity, &Position), (With<Health>, Without<AreaDamageZone>, Without<Enemy>, Without<Dormant>)>,
    mut contact_writer: MessageWriter<ZoneContact>,
) {
    for (zone_entity, zone, zone_position, mut contacts) in zones.iter_mut() {
        let inside: HashSet<Entity> = damageables
            .iter()
            .filter(|(_, position)| flat_distance(position.0, zone_position.0) <= zone.radius)
            .map(|(entity, _)| entity)
            .collect();

        let mut exited: Vec<Entity> = contacts.0.difference(&inside).copied().collect();
        exited.sort_unstable();
        for other in exited {
            contact_writer.write(ZoneContact::Exited { zone: zone_entity, other });
        }

        let mut entered: Vec<Entity> = inside.difference(&contacts.0).copied().collect();
        entered.sort_unstable();
        for other in entered {
            contact_writer.write(ZoneContact::Entered { zone: zone_entity, other });
        }

        contacts.0 = inside;
    }
}

pub fn zone_contact_system(
    mut contact_reader: MessageReader<ZoneContact>,
    mut zones: Query<(&mut AreaDamageZone, Option<&SpawnedBy>)>,
    enemies: Query<(), With<Enemy>>,
) {
    for contact in contact_reader.read() {
        match *contact {
            ZoneContact::Entered { zone, other } => {
                let Ok((mut zone_state, owner)) = zones.get_mut(zone) else {
                    continue;
                };
                if owner.is_some_and(|o| o.0 == other) || enemies.contains(other) {
                    continue;
                }
                if zone_state.on_enter(other) {
                    trace!("zone{{zone={:?} occupant={:?}}}", zone, other);
                }
            }
            ZoneContact::Exited { zone, other } => {
                if let Ok((mut zone_state, _)) = zones.get_mut(zone) {
                    zone_state.on_exit(other);
                }
            }
        }
    }
}

pub fn zone_tick_system(
    clock: Res<utils::frame::SimClock>,
    mut zones: Query<(&mut AreaDamageZone, Option<&SpawnedBy>)>,
    occupants: Query<&Health, Without<Dormant>>,
    mut damage_writer: MessageWriter<DamageMessage>,
) {
    for (mut zone, owner) in zones.iter_mut() {
        if let Some(occupant) = zone.occupant() {
            if !occupants.get(occupant).is_ok_and(|h| h.is_alive()) {
                zone.on_exit(occupant);
                continue;
            }
        }
        if let Some((target, amount)) = zone.tick(clock.delta) {
            damage_writer.write(DamageMessage {
                target,
                amount,
                source: owner.map(|o| o.0),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn damages_on_entry_then_every_interval() {
        let e = entities(1);
        let mut zone = AreaDamageZone::new(3, 0.5, 1.0);
        assert_eq!(zone.tick(0.1), None);

        assert!(zone.on_enter(e[0]));
        assert_eq!(zone.tick(0.25), Some((e[0], 3)));
        assert_eq!(zone.tick(0.2), None);
        assert_eq!(zone.tick(0.1), Some((e[0], 3)));
    }

    #[test]
    fn second_target_is_ignored_until_zone_empties() {
        let e = entities(2);
        let mut zone = AreaDamageZone::new(1, 1.0, 1.0);
        assert!(zone.on_enter(e[0]));
        assert!(!zone.on_enter(e[1]));
        assert_eq!(zone.occupant(), Some(e[0]));

        assert!(!zone.on_exit(e[1]));
        assert_eq!(zone.occupant(), Some(e[0]));

        assert!(zone.on_exit(e[0]));
        assert!(zone.on_enter(e[1]));
        assert_eq!(zone.occupant(), Some(e[1]));
    }

    #[test]
    fn enter_and_exit_are_idempotent() {
        let e = entities(1);
        let mut zone = AreaDamageZone::new(1, 1.0, 1.0);
        assert!(zone.on_enter(e[0]));
        assert_eq!(zone.tick(0.5), Some((e[0], 1)));
        assert!(zone.on_enter(e[0]));
        assert_eq!(zone.tick(0.25), None);

        assert!(zone.on_exit(e[0]));
        assert!(!zone.on_exit(e[0]));
    }

    #[test]
    fn damage_stops_on_exit() {
        let e = entities(1);
        let mut zone = AreaDamageZone::new(2, 0.1, 1.0);
        zone.on_enter(e[0]);
        assert!(zone.tick(0.1).is_some());
        zone.on_exit(e[0]);
        for _ in 0..10 {
            assert_eq!(zone.tick(0.1), None);
        }
    }
}
