//! Logger setup for foreground and service mode.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::config::DEFAULT_LOG_LEVEL;

/// Parses a level name, falling back to the default for unknown values.
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or_else(|_| {
        eprintln!("Unknown log level {:?}, using {}", level, DEFAULT_LOG_LEVEL);
        DEFAULT_LOG_LEVEL.parse().unwrap_or(LevelFilter::Warn)
    })
}

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_millis();
    builder
}

/// Logs to stderr.
pub fn init_stderr(level: LevelFilter) {
    builder(level).init();
}

/// Logs to `path`, truncating whatever the previous run left there.
pub fn init_file(level: LevelFilter, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    builder(level)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
