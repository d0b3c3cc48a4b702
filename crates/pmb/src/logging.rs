//! Tracing setup: a durable log file plus optional console output.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, fmt};

/// Console level for a `-v` count.
pub fn console_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// The log file always receives debug-level events. `quiet` drops the
/// console layer only.
pub fn init(
    log_path: &Path,
    verbosity: u8,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let durable = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    let console = (!quiet).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_level(verbosity))
    });

    tracing_subscriber::registry()
        .with(durable)
        .with(console)
        .try_init()?;
    Ok(())
}
