// src/logging.rs

//! Logging setup for `fmonitor` using `tracing` + `tracing-subscriber`.
//!
//! The level comes from `--log-level` (or `-v`), then the `FMONITOR_LOG`
//! environment variable, then defaults to `warn`. Output goes to stderr;
//! stdout carries only event records.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "FMONITOR_LOG";

const DEFAULT_LEVEL: Level = Level::WARN;

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("cannot install log subscriber: {err}"))
}

fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> Level {
    if let Some(level) = cli_level {
        return level.into();
    }

    // `Level` parses the five names case-insensitively, plus 1-5.
    env_level
        .map(|s| s.trim())
        .map(|s| if s.eq_ignore_ascii_case("warning") { "warn" } else { s })
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}
