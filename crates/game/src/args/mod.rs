use std::path::PathBuf;

use bevy::prelude::*;
use utils::{frame::SimClock, rng::SimRng};

use crate::{
    error::ConfigError,
    waves::{SpawnMethod, SpawnerConfig, WaveDebugEnabled},
};

mod cli;

pub use cli::{MethodArg, Opt};

/// Seed used when none is given, keeps runs reproducible.
pub const DEFAULT_SEED: u32 = 0x5eed_1e55;

/// Resolved harness options.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct HarnessArgs {
    pub config: Option<PathBuf>,
    pub seed: u32,
    pub frames: u32,
    pub step: f32,
    pub waves: u32,
    pub method: Option<SpawnMethod>,
    pub log_suffix: Option<String>,
    pub debug: bool,
}

impl From<Opt> for HarnessArgs {
    fn from(opt: Opt) -> Self {
        Self {
            config: opt.config,
            seed: opt.seed.unwrap_or(DEFAULT_SEED),
            frames: opt.frames,
            step: opt.step,
            waves: opt.waves,
            method: opt.method.map(|m| match m {
                MethodArg::RoundRobin => SpawnMethod::RoundRobin,
                MethodArg::Random => SpawnMethod::Random,
                MethodArg::Weighted => SpawnMethod::WeightedRandom,
            }),
            log_suffix: opt.log_suffix,
            debug: opt.debug,
        }
    }
}

pub fn get_args() -> HarnessArgs {
    use clap::Parser;
    Opt::parse().into()
}

impl HarnessArgs {
    /// Loads the configured spawner, with the command line override applied.
    pub fn spawner_config(&self) -> Result<SpawnerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SpawnerConfig::load(path)?,
            None => SpawnerConfig::default(),
        };
        if let Some(method) = self.method {
            config.spawn_method = method;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Seeds the simulation resources from the harness options.
pub struct BaseArgsPlugin(pub HarnessArgs);

impl Plugin for BaseArgsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SimClock::with_step(self.0.step))
            .insert_resource(SimRng::new(self.0.seed))
            .insert_resource(WaveDebugEnabled(self.0.debug))
            .insert_resource(self.0.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn method_override_applies() {
        let opt = Opt::parse_from(["horde", "--method", "round-robin", "--seed", "7"]);
        let args = HarnessArgs::from(opt);
        assert_eq!(args.seed, 7);
        assert_eq!(args.method, Some(SpawnMethod::RoundRobin));
        assert_eq!(args.spawner_config().unwrap().spawn_method, SpawnMethod::RoundRobin);
    }

    #[test]
    fn defaults_are_reproducible() {
        let args = HarnessArgs::from(Opt::parse_from(["horde"]));
        assert_eq!(args.seed, DEFAULT_SEED);
        assert_eq!(args.waves, 3);
        assert!(args.config.is_none());
    }
}
