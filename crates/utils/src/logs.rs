use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Encounter crates at `info`, every dependency (bevy included) at `warn`.
/// `RUST_LOG` replaces it entirely.
pub const ENCOUNTER_FILTER: &str = "warn,horde=info,game=info,utils=info";

const LOG_DIRECTORY: &str = "logs";

/// `logs/encounter_run_<suffix>.log`, the suffix defaulting to the local
/// start time so consecutive runs never overwrite each other.
pub fn run_log_path(directory: &Path, suffix: Option<String>) -> PathBuf {
    let suffix = suffix.unwrap_or_else(|| Local::now().format("%Y-%m-%d_%H-%M-%S").to_string());
    directory.join(format!("encounter_run_{}.log", suffix))
}

fn encounter_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(ENCOUNTER_FILTER))
}

/// Installs the global subscriber for a simulation run: the run log file
/// (plain, no timestamps, the `f=` frame fields order the lines) and stdout.
///
/// Falls back to stderr alone when the run log cannot be created. The
/// returned guard must outlive the run for the file writer to flush.
pub fn setup_logging(suffix: Option<String>) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let directory = Path::new(LOG_DIRECTORY);
    fs::create_dir_all(directory)?;
    let path = run_log_path(directory, suffix);

    let file = match fs::File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("run log {:?} unavailable ({}), logging to stderr", path, e);
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            tracing::subscriber::set_global_default(
                tracing_subscriber::registry()
                    .with(encounter_filter())
                    .with(fmt::Layer::new().with_writer(writer)),
            )?;
            return Ok(guard);
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(encounter_filter())
            .with(fmt::Layer::new().with_writer(writer).without_time().with_ansi(false))
            .with(fmt::Layer::new().with_writer(std::io::stdout).with_target(false)),
    )?;

    info!("run log at {:?}", path);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_log_is_named_after_the_suffix() {
        let path = run_log_path(Path::new("logs"), Some("seed42".into()));
        assert_eq!(path, Path::new("logs").join("encounter_run_seed42.log"));
    }

    #[test]
    fn encounter_filter_parses() {
        assert!(EnvFilter::try_new(ENCOUNTER_FILTER).is_ok());
    }
}
