//! Spawner configuration loaded from RON files.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{character::enemy::ability::AbilityDefinition, error::ConfigError, scaling::AbilityScaling};

/// Enemy template a spawner can pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeConfig {
    pub name: String,
    pub health: i32,
    /// Polled in this order by every actor of the archetype
    pub abilities: Vec<AbilityDefinition>,
    /// Each wave rolls the archetype's weight in `[min_weight, max_weight]`
    pub min_weight: f32,
    pub max_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpawnMethod {
    /// Archetypes in order, `spawned mod count`
    RoundRobin,
    /// Uniform pick
    Random,
    /// Cumulative walk over the normalized wave weights
    #[default]
    WeightedRandom,
}

/// What to do with a spawn slot that could not be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailedSpawnPolicy {
    /// Try the slot again next interval, up to `max_slot_retries` times
    #[default]
    Retry,
    /// Drop the slot from the wave's target
    Skip,
}

/// Main spawner configuration.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub archetypes: Vec<ArchetypeConfig>,

    // === Pacing (wave 0 baselines) ===

    /// Enemies in the first wave
    pub base_spawn_count: u32,
    /// Seconds between two spawns in the first wave
    pub base_spawn_interval: f32,

    // === Behaviour ===

    pub spawn_method: SpawnMethod,
    /// Start the next wave as soon as one clears
    pub continuous: bool,
    /// Start wave 1 on the first tick
    pub auto_start: bool,
    /// Max distance between the picked vertex and the walkable spawn point
    pub sample_radius: f32,
    pub failed_spawn_policy: FailedSpawnPolicy,
    pub max_slot_retries: u32,
    /// Dormant shells pre-spawned per archetype
    pub pool_size: usize,

    pub scaling: AbilityScaling,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            archetypes: vec![
                ArchetypeConfig {
                    name: "Drake".into(),
                    health: 30,
                    abilities: vec![AbilityDefinition::breath(), AbilityDefinition::jump()],
                    min_weight: 0.2,
                    max_weight: 0.5,
                },
                ArchetypeConfig {
                    name: "Frostcaller".into(),
                    health: 18,
                    abilities: vec![AbilityDefinition::ice_lance()],
                    min_weight: 0.3,
                    max_weight: 0.6,
                },
                ArchetypeConfig {
                    name: "Plaguebearer".into(),
                    health: 24,
                    abilities: vec![AbilityDefinition::poison_gas(), AbilityDefinition::jump()],
                    min_weight: 0.1,
                    max_weight: 0.3,
                },
            ],
            base_spawn_count: 5,
            base_spawn_interval: 1.0,
            spawn_method: SpawnMethod::WeightedRandom,
            continuous: true,
            auto_start: true,
            sample_radius: 2.0,
            failed_spawn_policy: FailedSpawnPolicy::Retry,
            max_slot_retries: 3,
            pool_size: 32,
            scaling: AbilityScaling::default(),
        }
    }
}

impl SpawnerConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: SpawnerConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archetypes.is_empty() {
            return Err(ConfigError::Invalid("at least one archetype is required".into()));
        }
        for archetype in &self.archetypes {
            if archetype.health <= 0 {
                return Err(ConfigError::Invalid(format!("archetype {} needs positive health", archetype.name)));
            }
            if archetype.min_weight < 0.0 || archetype.min_weight > archetype.max_weight {
                return Err(ConfigError::Invalid(format!(
                    "archetype {} weight range [{}, {}] is inverted or negative",
                    archetype.name, archetype.min_weight, archetype.max_weight
                )));
            }
            for ability in &archetype.abilities {
                ability.validate()?;
            }
        }
        if self.spawn_method == SpawnMethod::WeightedRandom
            && self.archetypes.iter().all(|a| a.max_weight <= 0.0)
        {
            return Err(ConfigError::Invalid("weighted spawning needs a positive weight".into()));
        }
        if self.base_spawn_count == 0 {
            return Err(ConfigError::Invalid("base spawn count must be at least 1".into()));
        }
        if self.base_spawn_interval < 0.0 || self.sample_radius < 0.0 {
            return Err(ConfigError::Invalid("spawn interval and sample radius cannot be negative".into()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool size must be at least 1".into()));
        }
        Ok(())
    }

    /// `(min, max)` weight range of every archetype, in order.
    pub fn weight_ranges(&self) -> Vec<(f32, f32)> {
        self.archetypes.iter().map(|a| (a.min_weight, a.max_weight)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SpawnerConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_ron() {
        let config = SpawnerConfig::from_ron_str(
            r#"(
                archetypes: [
                    (
                        name: "Drake",
                        health: 10,
                        abilities: [
                            (
                                name: "Breath",
                                cooldown: 4.0,
                                damage: 2,
                                unlock_level: 1,
                                kind: Breath(range: 3.0, duration: 3.0, tick_rate: 0.5, turn_speed: 5.0, zone_radius: 3.0),
                            ),
                        ],
                        min_weight: 1.0,
                        max_weight: 1.0,
                    ),
                ],
                base_spawn_count: 3,
                spawn_method: RoundRobin,
            )"#,
        )
        .unwrap();

        assert_eq!(config.archetypes.len(), 1);
        assert_eq!(config.base_spawn_count, 3);
        assert_eq!(config.spawn_method, SpawnMethod::RoundRobin);
        assert_eq!(config.base_spawn_interval, 1.0);
        assert!(config.continuous);
    }

    #[test]
    fn bundled_spawner_asset_loads() {
        let config = SpawnerConfig::from_ron_str(include_str!("../../../../assets/waves/spawner.ron")).unwrap();
        assert_eq!(config.archetypes.len(), 3);
        assert_eq!(config.archetypes[1].abilities[0].kind.label(), "volley");
        assert_eq!(config.pool_size, SpawnerConfig::default().pool_size);
    }

    #[test]
    fn inverted_weight_range_is_rejected() {
        let mut config = SpawnerConfig::default();
        config.archetypes[0].min_weight = 0.9;
        config.archetypes[0].max_weight = 0.1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        assert!(matches!(
            SpawnerConfig::from_ron_str("(archetypes: [,])"),
            Err(ConfigError::Ron(_))
        ));
    }
}
