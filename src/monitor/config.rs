// src/monitor/config.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{MonitorError, Result};

/// Latency used when none is configured, in seconds.
pub const DEFAULT_LATENCY: f64 = 1.0;

/// Settings shared by every backend.
///
/// The struct derives `serde` traits so embedders can load it from whatever
/// format they already use; [`MonitorConfig::validate`] must pass before it
/// is handed to a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Roots to watch, in the order given.
    pub paths: Vec<PathBuf>,
    /// Seconds between polls, or the wait timeout of event-driven backends.
    pub latency: f64,
    pub recursive: bool,
    pub directory_only: bool,
    pub follow_symlinks: bool,
    pub watch_access: bool,
    pub allow_overflow: bool,
    pub fire_idle_event: bool,
    /// Free-form backend options.
    pub properties: BTreeMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            latency: DEFAULT_LATENCY,
            recursive: false,
            directory_only: false,
            follow_symlinks: false,
            watch_access: false,
            allow_overflow: false,
            fire_idle_event: false,
            properties: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    /// The latency as a `Duration`. Values that passed [`validate_latency`]
    /// always convert; anything else saturates.
    pub fn latency_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.latency).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(MonitorError::PathsNotSet);
        }
        validate_latency(self.latency)?;
        if let Some(name) = self.properties.keys().find(|k| k.is_empty()) {
            return Err(MonitorError::InvalidProperty(format!(
                "property name must not be empty (got {name:?})"
            )));
        }
        Ok(())
    }
}

/// A latency must be a non-negative number of seconds that fits a `Duration`.
pub(crate) fn validate_latency(latency: f64) -> Result<()> {
    match Duration::try_from_secs_f64(latency) {
        Ok(_) => Ok(()),
        Err(_) => Err(MonitorError::InvalidLatency(latency)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.latency, DEFAULT_LATENCY);
        assert!(!cfg.recursive);
        assert!(cfg.properties.is_empty());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(matches!(
            MonitorConfig::default().validate(),
            Err(MonitorError::PathsNotSet)
        ));

        let mut cfg = MonitorConfig::new(vec!["/w".into()]);
        cfg.latency = f64::NAN;
        assert!(matches!(cfg.validate(), Err(MonitorError::InvalidLatency(_))));

        cfg.latency = 0.0;
        assert!(cfg.validate().is_ok());

        cfg.properties.insert(String::new(), "x".into());
        assert!(matches!(cfg.validate(), Err(MonitorError::InvalidProperty(_))));
    }

    #[test]
    fn latency_must_fit_a_duration() {
        for bad in [-0.5, f64::INFINITY, f64::NAN, 1e20, f64::MAX] {
            assert!(
                matches!(validate_latency(bad), Err(MonitorError::InvalidLatency(_))),
                "{bad} should be rejected"
            );
        }

        for good in [0.0, 0.25, 3600.0, 1e9] {
            validate_latency(good).unwrap();
            let cfg = MonitorConfig {
                latency: good,
                ..MonitorConfig::new(vec!["/w".into()])
            };
            assert_eq!(cfg.latency_duration(), Duration::from_secs_f64(good));
        }
    }
}
