// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;

/// Backend selector used by the factory.
///
/// - `SystemDefault`: the best backend available on this platform.
/// - `Inotify`: kernel notifications; only constructible on Linux.
/// - `Poll`: periodic stat walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    #[default]
    SystemDefault,
    #[serde(rename = "inotify_monitor")]
    Inotify,
    #[serde(rename = "poll_monitor")]
    Poll,
}

impl MonitorType {
    pub fn name(self) -> &'static str {
        match self {
            MonitorType::SystemDefault => "system_default",
            MonitorType::Inotify => "inotify_monitor",
            MonitorType::Poll => "poll_monitor",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MonitorType {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "system_default" => Ok(MonitorType::SystemDefault),
            "inotify_monitor" => Ok(MonitorType::Inotify),
            "poll_monitor" => Ok(MonitorType::Poll),
            other => Err(MonitorError::UnknownMonitorType(other.to_string())),
        }
    }
}
