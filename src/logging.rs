//! Per-run log file under `logs/`, one file per invocation.
//!
//! The terminal is reserved for the progress bar and the final summary;
//! everything else goes to the file through `tracing`. `RUST_LOG` overrides
//! the default filter.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber writing to `logs/<prefix>_<timestamp>.log`
/// and return the log file path. Call once, at startup.
pub fn init(prefix: &str, verbose: bool) -> Result<PathBuf> {
    let log_dir = Path::new("logs");
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!(
        "{prefix}_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let file = fs::File::create(&path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}
