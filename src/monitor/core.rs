// src/monitor/core.rs

//! State shared between the backend loop and the idle notifier.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tracing::debug;

use crate::errors::{MonitorError, Result};
use crate::event::{Event, EventFlag};
use crate::filter::{EventTypeFilterSet, PathFilterSet};
use crate::monitor::config::MonitorConfig;

/// Opaque value handed back to the callback on every invocation.
pub type Context = Arc<dyn Any + Send + Sync>;

/// Receives every non-empty, filtered batch of events.
pub type EventCallback = Arc<dyn Fn(&[Event], Option<&(dyn Any + Send + Sync)>) + Send + Sync>;

/// Wrap a closure as an [`EventCallback`].
pub fn callback<F>(f: F) -> EventCallback
where
    F: Fn(&[Event], Option<&(dyn Any + Send + Sync)>) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) running: bool,
    pub(crate) should_stop: bool,
}

#[derive(Debug)]
struct NotifyState {
    last_notification: Instant,
}

/// Configuration, filters and lifecycle state of a monitor.
///
/// Backends receive a shared reference to the core in
/// [`Backend::run`](crate::monitor::Backend::run) and use it to check for
/// stop requests, filter paths during scans, and deliver events.
pub struct MonitorCore {
    pub(crate) config: MonitorConfig,
    pub(super) path_filters: PathFilterSet,
    pub(super) event_type_filters: EventTypeFilterSet,
    pub(super) callback: EventCallback,
    pub(super) context: Option<Context>,
    run_state: Mutex<RunState>,
    notify_state: Mutex<NotifyState>,
}

impl fmt::Debug for MonitorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorCore")
            .field("config", &self.config)
            .field("path_filters", &self.path_filters)
            .field("event_type_filters", &self.event_type_filters)
            .finish_non_exhaustive()
    }
}

impl MonitorCore {
    /// Fails with `CallbackNotSet` without a callback and `PathsNotSet`
    /// without paths.
    pub fn new(
        paths: Vec<PathBuf>,
        callback: Option<EventCallback>,
        context: Option<Context>,
    ) -> Result<Self> {
        let callback = callback.ok_or(MonitorError::CallbackNotSet)?;
        if paths.is_empty() {
            return Err(MonitorError::PathsNotSet);
        }

        Ok(Self {
            config: MonitorConfig::new(paths),
            path_filters: PathFilterSet::new(),
            event_type_filters: EventTypeFilterSet::default(),
            callback,
            context,
            run_state: Mutex::new(RunState::default()),
            notify_state: Mutex::new(NotifyState {
                last_notification: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn latency(&self) -> Duration {
        self.config.latency_duration()
    }

    pub(crate) fn run_state(&self) -> MutexGuard<'_, RunState> {
        self.run_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_state(&self) -> MutexGuard<'_, NotifyState> {
        self.notify_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `stop()` has been requested. Backends check this once per
    /// loop iteration.
    pub fn should_stop(&self) -> bool {
        self.run_state().should_stop
    }

    pub fn accept_path(&self, path: &Path) -> bool {
        self.path_filters.accepts_path(path)
    }

    /// Filter `events` and hand the survivors to the callback as one batch.
    ///
    /// Each event keeps only the flags allowed by the event-type filters and
    /// is dropped when none remain or its path is rejected. The callback is
    /// not invoked for an empty batch.
    pub fn notify_events(&self, events: &[Event]) {
        let mut state = self.notify_state();
        state.last_notification = Instant::now();

        let filtered: Vec<Event> = events
            .iter()
            .filter_map(|event| {
                let flags = self.event_type_filters.filter_flags(event.flags());
                if flags.is_empty() || !self.accept_path(event.path()) {
                    return None;
                }
                Some(Event::new(event.path(), event.time(), flags))
            })
            .collect();

        if filtered.is_empty() {
            return;
        }

        debug!(count = filtered.len(), "notifying events");
        (self.callback)(&filtered, self.context.as_deref());
    }

    /// Report a queue overflow, or fail when overflows are not allowed.
    pub fn notify_overflow(&self, path: &Path) -> Result<()> {
        if !self.config.allow_overflow {
            return Err(MonitorError::Overflow(path.to_path_buf()));
        }

        self.notify_events(&[Event::new(
            path,
            SystemTime::now(),
            vec![EventFlag::Overflow],
        )]);
        Ok(())
    }

    pub(crate) fn since_last_notification(&self) -> Duration {
        self.notify_state().last_notification.elapsed()
    }

    pub(crate) fn reset_last_notification(&self) {
        self.notify_state().last_notification = Instant::now();
    }
}
