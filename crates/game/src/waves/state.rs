//! Wave state machine of one spawner.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{character::enemy::ability::AbilityInstance, error::SpawnError};

use super::{
    config::{SpawnMethod, SpawnerConfig},
    selection::roll_weights,
};

/// Current phase of the wave system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WavePhase {
    /// Before the first wave, after a reset, or between waves without
    /// continuous spawning
    #[default]
    Idle,
    /// Spawn loop running
    Spawning,
    /// Everything spawned, waiting for kills
    WaveActive,
    /// All wave enemies dead, next wave not started yet
    WaveCleared,
}

#[derive(Component, Debug, Clone)]
pub struct WaveState {
    pub phase: WavePhase,
    /// Current wave level, 0 before the first wave
    pub level: u32,

    // === Current wave ===

    /// Enemies to spawn this wave
    pub spawn_count: u32,
    /// Seconds between spawns this wave
    pub spawn_interval: f32,
    pub spawned: u32,
    pub alive: u32,
    /// Normalized archetype weights rolled for this wave
    pub weights: Vec<f32>,
    /// Abilities of every archetype scaled to this wave's level
    pub templates: Vec<Vec<AbilityInstance>>,
    /// Seconds until the next spawn attempt
    pub spawn_timer: f32,
    /// Failed attempts on the current slot
    pub slot_retries: u32,

    // === Statistics ===

    pub total_kills: u32,
    pub failed_spawns: u32,
    pub skipped_slots: u32,
    pub waves_cleared: u32,
}

impl WaveState {
    pub fn new(config: &SpawnerConfig) -> Self {
        Self {
            phase: WavePhase::Idle,
            level: 0,
            spawn_count: config.base_spawn_count,
            spawn_interval: config.base_spawn_interval,
            spawned: 0,
            alive: 0,
            weights: Vec::new(),
            templates: Vec::new(),
            spawn_timer: 0.0,
            slot_retries: 0,
            total_kills: 0,
            failed_spawns: 0,
            skipped_slots: 0,
            waves_cleared: 0,
        }
    }

    /// Enters the next level: rescales every archetype, re-rolls the weights
    /// and restarts the spawn loop, first spawn immediate.
    pub fn start_wave(&mut self, config: &SpawnerConfig, rng: &mut impl Rng) -> Result<(), SpawnError> {
        let weights = match roll_weights(&config.weight_ranges(), rng) {
            // Only the weighted policy reads the weights
            Err(SpawnError::ZeroWeights) if config.spawn_method != SpawnMethod::WeightedRandom => {
                let count = config.archetypes.len();
                vec![1.0 / count as f32; count]
            }
            rolled => rolled?,
        };

        self.level += 1;
        self.weights = weights;
        self.templates = config
            .archetypes
            .iter()
            .map(|archetype| {
                archetype
                    .abilities
                    .iter()
                    .map(|ability| ability.scale_for_level(&config.scaling, self.level))
                    .collect()
            })
            .collect();
        self.spawned = 0;
        self.alive = 0;
        self.spawn_timer = 0.0;
        self.slot_retries = 0;
        self.phase = WavePhase::Spawning;
        Ok(())
    }

    /// Pacing of the wave after this one, always derived from the baselines.
    pub fn scale_up(&mut self, config: &SpawnerConfig) {
        let next = self.level + 1;
        self.spawn_count = config.scaling.spawn_count(config.base_spawn_count, next).max(1);
        self.spawn_interval = config.scaling.spawn_interval(config.base_spawn_interval, next);
    }

    pub fn record_spawn(&mut self) {
        self.spawned += 1;
        self.alive += 1;
        self.slot_retries = 0;
        self.update_spawning_done();
    }

    /// Counts a failed attempt on the current slot. Returns true when the
    /// slot has to be given up.
    pub fn record_failure(&mut self, skip_immediately: bool, max_retries: u32) -> bool {
        self.failed_spawns += 1;
        self.slot_retries += 1;
        if skip_immediately || self.slot_retries > max_retries {
            self.spawn_count = self.spawn_count.saturating_sub(1);
            self.skipped_slots += 1;
            self.slot_retries = 0;
            self.update_spawning_done();
            return true;
        }
        false
    }

    /// Returns true when this death cleared the wave.
    pub fn record_death(&mut self) -> bool {
        self.alive = self.alive.saturating_sub(1);
        self.total_kills += 1;
        self.is_cleared()
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self.phase, WavePhase::Spawning | WavePhase::WaveActive)
            && self.alive == 0
            && self.spawned == self.spawn_count
    }

    /// Back to the wave 0 baselines, statistics kept.
    pub fn reset(&mut self, config: &SpawnerConfig) {
        *self = Self {
            total_kills: self.total_kills,
            failed_spawns: self.failed_spawns,
            skipped_slots: self.skipped_slots,
            waves_cleared: self.waves_cleared,
            ..Self::new(config)
        };
    }

    fn update_spawning_done(&mut self) {
        if self.phase == WavePhase::Spawning && self.spawned >= self.spawn_count {
            self.phase = WavePhase::WaveActive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::Curve;
    use utils::rng::SimRng;

    fn config() -> SpawnerConfig {
        let mut config = SpawnerConfig::default();
        config.scaling.spawn_count = Curve::linear(1.0, 0.1);
        config
    }

    #[test]
    fn start_wave_scales_templates_to_new_level() {
        let config = config();
        let mut state = WaveState::new(&config);
        let mut rng = SimRng::new(9);
        state.start_wave(&config, &mut rng).unwrap();

        assert_eq!(state.level, 1);
        assert_eq!(state.phase, WavePhase::Spawning);
        assert_eq!(state.spawn_count, config.base_spawn_count);
        assert_eq!(state.templates.len(), config.archetypes.len());
        let breath = &state.templates[0][0];
        assert_eq!(breath.damage, config.archetypes[0].abilities[0].damage + config.scaling.damage_bonus(1));
        assert!((state.weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn scale_up_derives_from_baselines() {
        let config = config();
        let mut state = WaveState::new(&config);
        state.level = 2;
        state.spawn_count = 999;
        state.spawn_interval = 123.0;
        state.scale_up(&config);

        let expected = (5.0 * config.scaling.spawn_count.evaluate(3.0)).floor() as u32;
        assert_eq!(state.spawn_count, expected);
        assert_eq!(
            state.spawn_interval,
            config.base_spawn_interval * config.scaling.spawn_rate.evaluate(3.0)
        );

        state.scale_up(&config);
        assert_eq!(state.spawn_count, expected);
    }

    #[test]
    fn wave_clears_only_when_all_spawned_are_dead() {
        let config = config();
        let mut state = WaveState::new(&config);
        state.start_wave(&config, &mut SimRng::new(1)).unwrap();
        state.spawn_count = 2;

        state.record_spawn();
        assert!(!state.record_death());
        state.record_spawn();
        assert_eq!(state.phase, WavePhase::WaveActive);
        assert!(state.record_death());
        assert_eq!(state.total_kills, 2);
    }

    #[test]
    fn zero_weights_only_block_weighted_selection() {
        let mut config = config();
        for archetype in config.archetypes.iter_mut() {
            archetype.min_weight = 0.0;
            archetype.max_weight = 0.0;
        }
        let mut state = WaveState::new(&config);
        assert_eq!(
            state.start_wave(&config, &mut SimRng::new(3)),
            Err(SpawnError::ZeroWeights)
        );
        assert_eq!(state.level, 0);

        config.spawn_method = SpawnMethod::RoundRobin;
        state.start_wave(&config, &mut SimRng::new(3)).unwrap();
        assert_eq!(state.weights.len(), 3);
        assert!((state.weights[0] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn skipped_slot_shrinks_target() {
        let config = config();
        let mut state = WaveState::new(&config);
        state.start_wave(&config, &mut SimRng::new(1)).unwrap();
        state.spawn_count = 1;

        assert!(!state.record_failure(false, 1));
        assert!(state.record_failure(false, 1));
        assert_eq!(state.spawn_count, 0);
        assert_eq!(state.skipped_slots, 1);
        assert_eq!(state.failed_spawns, 2);
        assert!(state.is_cleared());
    }
}
