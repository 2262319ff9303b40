// src/factory.rs

//! Backend selection.
//!
//! Monitors can be requested by [`MonitorType`] or by registered name. The
//! two lookups fail differently: an unavailable type is an error, an unknown
//! name is `Ok(None)`.

use std::path::PathBuf;

use tracing::debug;

use crate::backend::{PollBackend, POLL_MONITOR_NAME};
use crate::errors::{MonitorError, Result};
use crate::monitor::{Backend, Context, EventCallback, Monitor, MonitorCore};
use crate::types::MonitorType;

#[cfg(target_os = "linux")]
use crate::backend::{InotifyBackend, INOTIFY_MONITOR_NAME};

/// Registered backend names, sorted.
const REGISTERED: &[(&str, MonitorType)] = &[
    #[cfg(target_os = "linux")]
    (INOTIFY_MONITOR_NAME, MonitorType::Inotify),
    (POLL_MONITOR_NAME, MonitorType::Poll),
];

/// The backend `SystemDefault` resolves to on this platform.
pub const fn default_type() -> MonitorType {
    if cfg!(target_os = "linux") {
        MonitorType::Inotify
    } else {
        MonitorType::Poll
    }
}

/// Build a monitor of the given type.
///
/// Fails with `CallbackNotSet` or `PathsNotSet` before any backend resource
/// is acquired, and with `UnknownMonitorType` when the type is not available
/// on this platform.
pub fn create_monitor(
    monitor_type: MonitorType,
    paths: Vec<PathBuf>,
    callback: Option<EventCallback>,
    context: Option<Context>,
) -> Result<Monitor> {
    let core = MonitorCore::new(paths, callback, context)?;
    let backend = create_backend(monitor_type)?;
    debug!(backend = backend.name(), "monitor created");
    Ok(Monitor::from_parts(core, backend))
}

/// Build a monitor by registered name. Unknown names yield `Ok(None)`.
pub fn create_monitor_by_name(
    name: &str,
    paths: Vec<PathBuf>,
    callback: Option<EventCallback>,
    context: Option<Context>,
) -> Result<Option<Monitor>> {
    match lookup(name) {
        Some(monitor_type) => create_monitor(monitor_type, paths, callback, context).map(Some),
        None => Ok(None),
    }
}

pub fn get_types() -> Vec<String> {
    REGISTERED.iter().map(|(name, _)| name.to_string()).collect()
}

pub fn exists_type(name: &str) -> bool {
    lookup(name).is_some()
}

fn lookup(name: &str) -> Option<MonitorType> {
    REGISTERED
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, monitor_type)| *monitor_type)
}

fn create_backend(monitor_type: MonitorType) -> Result<Box<dyn Backend>> {
    match monitor_type {
        MonitorType::SystemDefault => create_backend(default_type()),
        #[cfg(target_os = "linux")]
        MonitorType::Inotify => Ok(Box::new(InotifyBackend::new()?)),
        MonitorType::Poll => Ok(Box::new(PollBackend::new())),
        #[allow(unreachable_patterns)]
        other => Err(MonitorError::UnknownMonitorType(other.to_string())),
    }
}
