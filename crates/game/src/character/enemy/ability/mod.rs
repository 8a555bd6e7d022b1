//! Enemy abilities.
//!
//! An [`AbilityDefinition`] is the configured, level-independent descriptor.
//! Spawners scale it once per wave into an [`AbilityInstance`] and every actor
//! gets its own clone, so cooldowns and the activating flag are never shared.
//! Execution lives in [`execution`].

pub mod execution;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    scaling::{AbilityScaling, Curve},
    services::LineOfSight,
};

/// Kind specific tuning of an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Channeled cone in front of the actor, re-aimed every tick.
    Breath {
        range: f32,
        duration: f32,
        tick_rate: f32,
        turn_speed: f32,
        zone_radius: f32,
    },
    /// `shots` projectiles separated by `delay`, needs a clear line of sight.
    Volley {
        range: f32,
        shots: u32,
        delay: f32,
        projectile_speed: f32,
        projectile_radius: f32,
        spawn_offset: [f32; 3],
    },
    /// Jump arc onto the target, usable only inside a distance band.
    Leap {
        min_distance: f32,
        max_distance: f32,
        speed: f32,
        height: Curve,
    },
    /// Stationary cloud dropped on the target's position.
    GasCloud {
        range: f32,
        duration: f32,
        tick_rate: f32,
        radius: f32,
    },
}

impl AbilityKind {
    /// Geometric precondition, on top of the shared cooldown rule.
    pub fn in_reach(&self, ctx: &UseContext) -> bool {
        let distance = ctx.origin.distance(ctx.target);
        match self {
            AbilityKind::Breath { range, .. } | AbilityKind::GasCloud { range, .. } => distance <= *range,
            AbilityKind::Volley {
                range,
                projectile_radius,
                spawn_offset,
                ..
            } => {
                // Swept from where the shot leaves, not from the feet
                let offset = Vec3::from_array(*spawn_offset);
                distance <= *range
                    && !ctx
                        .sight
                        .is_obstructed(ctx.origin + offset, ctx.target + offset, *projectile_radius)
            }
            AbilityKind::Leap {
                min_distance,
                max_distance,
                ..
            } => distance >= *min_distance && distance <= *max_distance,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AbilityKind::Breath { .. } => "breath",
            AbilityKind::Volley { .. } => "volley",
            AbilityKind::Leap { .. } => "leap",
            AbilityKind::GasCloud { .. } => "gas_cloud",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            AbilityKind::Breath {
                range,
                duration,
                tick_rate,
                turn_speed,
                zone_radius,
            } => {
                if *range <= 0.0 || *duration < 0.0 || *tick_rate <= 0.0 || *turn_speed <= 0.0 || *zone_radius <= 0.0 {
                    return Err("breath needs positive range, tick rate, turn speed and radius".into());
                }
            }
            AbilityKind::Volley {
                range,
                shots,
                delay,
                projectile_speed,
                ..
            } => {
                if *range <= 0.0 || *shots == 0 || *delay < 0.0 || *projectile_speed <= 0.0 {
                    return Err("volley needs positive range and speed, at least one shot".into());
                }
            }
            AbilityKind::Leap {
                min_distance,
                max_distance,
                speed,
                ..
            } => {
                if *min_distance < 0.0 || min_distance > max_distance {
                    return Err(format!("leap band [{}, {}] is empty", min_distance, max_distance));
                }
                if *speed <= 0.0 {
                    return Err("leap speed must be positive".into());
                }
            }
            AbilityKind::GasCloud {
                range,
                duration,
                tick_rate,
                radius,
            } => {
                if *range <= 0.0 || *duration < 0.0 || *tick_rate <= 0.0 || *radius <= 0.0 {
                    return Err("gas cloud needs positive range, tick rate and radius".into());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    /// Seconds between two uses
    pub cooldown: f32,
    pub damage: i32,
    /// Lowest actor level allowed to use it
    pub unlock_level: u32,
    pub kind: AbilityKind,
}

impl AbilityDefinition {
    pub fn breath() -> Self {
        Self {
            name: "Breath".into(),
            cooldown: 8.0,
            damage: 4,
            unlock_level: 1,
            kind: AbilityKind::Breath {
                range: 3.0,
                duration: 3.0,
                tick_rate: 0.5,
                turn_speed: 5.0,
                zone_radius: 3.0,
            },
        }
    }

    pub fn ice_lance() -> Self {
        Self {
            name: "IceLance".into(),
            cooldown: 5.0,
            damage: 6,
            unlock_level: 1,
            kind: AbilityKind::Volley {
                range: 10.0,
                shots: 2,
                delay: 0.25,
                projectile_speed: 10.0,
                projectile_radius: 0.25,
                spawn_offset: [0.0, 1.0, 0.0],
            },
        }
    }

    pub fn jump() -> Self {
        Self {
            name: "Jump".into(),
            cooldown: 6.0,
            damage: 0,
            unlock_level: 2,
            kind: AbilityKind::Leap {
                min_distance: 1.5,
                max_distance: 5.0,
                speed: 1.0,
                height: Curve::new(vec![(0.0, 0.0), (0.5, 2.0), (1.0, 0.0)]),
            },
        }
    }

    pub fn poison_gas() -> Self {
        Self {
            name: "PoisonGas".into(),
            cooldown: 12.0,
            damage: 2,
            unlock_level: 3,
            kind: AbilityKind::GasCloud {
                range: 6.0,
                duration: 10.0,
                tick_rate: 0.3,
                radius: 2.0,
            },
        }
    }

    /// Copy of this definition tuned for `level`.
    pub fn scale_for_level(&self, scaling: &AbilityScaling, level: u32) -> AbilityInstance {
        AbilityInstance {
            name: self.name.clone(),
            cooldown: self.cooldown,
            damage: self.damage + scaling.damage_bonus(level),
            unlock_level: self.unlock_level,
            kind: self.kind.clone(),
            activating: false,
            last_use: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cooldown < 0.0 {
            return Err(ConfigError::Invalid(format!("ability {} has a negative cooldown", self.name)));
        }
        self.kind
            .validate()
            .map_err(|reason| ConfigError::Invalid(format!("ability {}: {}", self.name, reason)))
    }
}

/// What an actor knows about itself and its target when polling abilities.
pub struct UseContext<'a> {
    pub now: f32,
    pub level: u32,
    pub origin: Vec3,
    pub target: Vec3,
    pub sight: &'a dyn LineOfSight,
}

/// Per-actor, per-level ability state.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityInstance {
    pub name: String,
    pub cooldown: f32,
    pub damage: i32,
    pub unlock_level: u32,
    pub kind: AbilityKind,
    /// Set while its procedure runs
    pub activating: bool,
    /// Simulation time of the last completed use
    pub last_use: f32,
}

impl AbilityInstance {
    pub fn off_cooldown(&self, now: f32) -> bool {
        now >= self.last_use + self.cooldown
    }

    pub fn can_use(&self, ctx: &UseContext) -> bool {
        !self.activating
            && ctx.level >= self.unlock_level
            && self.off_cooldown(ctx.now)
            && self.kind.in_reach(ctx)
    }

    /// Marks the instance as running.
    ///
    /// # Panics
    /// If it is already running: two overlapping executions of one ability
    /// would corrupt the actor's state.
    pub fn begin(&mut self) {
        assert!(!self.activating, "ability {} used while already activating", self.name);
        self.activating = true;
    }

    pub fn finish(&mut self, now: f32) {
        self.last_use = now;
        self.activating = false;
    }
}

/// The actor's own ability instances, polled in order.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct EnemyAbilities(pub Vec<AbilityInstance>);

impl EnemyAbilities {
    pub fn activating(&self) -> Option<usize> {
        self.0.iter().position(|a| a.activating)
    }

    /// First ability usable right now.
    pub fn first_usable(&self, ctx: &UseContext) -> Option<usize> {
        self.0.iter().position(|a| a.can_use(ctx))
    }
}
