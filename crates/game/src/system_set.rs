use bevy::prelude::SystemSet;

/// Tick stages of the encounter, chained in this order inside `Update`.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum EncounterSystemSet {
    Clock,
    Triggers,
    Spawning,
    EnemyAI,
    Abilities,
    Damage,
    DeathManagement,
}
