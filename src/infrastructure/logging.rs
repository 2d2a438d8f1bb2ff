use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "dayplanner.log";

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "dayplanner=debug"
    } else {
        "dayplanner=info"
    }
}

/// JSON lines go to `logs_dir/dayplanner.log`; warnings and errors are echoed
/// to stderr. `RUST_LOG` overrides the default filter.
pub fn init_logging(logs_dir: &Path, verbose: bool) -> Result<(), InfraError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr.with_max_level(Level::WARN))
                .with_target(false)
                .without_time()
                .compact(),
        )
        .try_init()
        .map_err(|error| InfraError::InvalidConfig(format!("failed to initialize logging: {error}")))
}
