use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    RoundRobin,
    Random,
    Weighted,
}

#[derive(Parser, Debug)]
#[clap(about = "Run a headless enemy encounter and print the spawner diagnostics")]
pub struct Opt {
    /// Spawner configuration (RON), built-in defaults when absent
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    #[clap(short, long)]
    pub seed: Option<u32>,
    /// Frame budget of the run
    #[clap(short, long, default_value_t = 36_000)]
    pub frames: u32,
    /// Seconds per simulation tick
    #[clap(long, default_value_t = utils::frame::DEFAULT_STEP)]
    pub step: f32,
    /// Stop once this many waves cleared
    #[clap(short, long, default_value_t = 3)]
    pub waves: u32,
    /// Override the configured spawn method
    #[clap(short, long, value_enum)]
    pub method: Option<MethodArg>,
    /// Log file suffix, a timestamp when absent
    #[clap(long)]
    pub log_suffix: Option<String>,
    /// Periodic diagnostics dump in the log
    #[clap(long)]
    pub debug: bool,
}
