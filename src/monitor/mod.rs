// src/monitor/mod.rs

//! The monitor facade shared by every backend.
//!
//! This module is responsible for:
//! - Holding configuration, compiled filters and lifecycle state ([`MonitorCore`]).
//! - Driving a [`Backend`] from `start()` until it returns.
//! - Running the optional idle notifier next to the backend loop.
//!
//! A monitor is configured through `&mut self` and run through `&self`, so
//! the usual pattern is to finish configuration, wrap it in an `Arc`, call
//! `start()` on one thread and `stop()` from another.

pub mod config;
pub mod core;
mod idle;
pub mod scan;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;

use tracing::{info, warn};

use crate::errors::{MonitorError, Result};
use crate::filter::{CompiledFilter, EventTypeFilter, EventTypeFilterSet, PathFilter, PathFilterSet};

pub use self::config::{MonitorConfig, DEFAULT_LATENCY};
pub use self::core::{callback, Context, EventCallback, MonitorCore};
pub use self::scan::TreeWalker;

use self::config::validate_latency;

/// A change-detection strategy.
///
/// `run` owns the calling thread until the backend loop exits. It must check
/// [`MonitorCore::should_stop`] at least once per iteration and deliver
/// events through [`MonitorCore::notify_events`].
pub trait Backend: Send + Sync {
    /// Name used in logs and by the factory.
    fn name(&self) -> &'static str;

    fn run(&self, core: &MonitorCore) -> Result<()>;

    /// Called by `stop()` after the stop flag is set. Backends whose wait
    /// cannot observe the flag on their own can use it to wake up.
    fn on_stop(&self) {}
}

/// A configured monitor bound to one backend.
///
/// Dropping a monitor does not stop it: `start()` borrows the monitor for as
/// long as it runs, so a running monitor cannot be dropped. Call `stop()` and
/// wait for `start()` to return before releasing it.
pub struct Monitor {
    core: MonitorCore,
    backend: Box<dyn Backend>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("backend", &self.backend.name())
            .field("core", &self.core)
            .finish()
    }
}

impl Monitor {
    /// Build a monitor around `backend`.
    ///
    /// Fails with `CallbackNotSet` without a callback and `PathsNotSet` when
    /// `paths` is empty.
    pub fn new(
        backend: Box<dyn Backend>,
        paths: Vec<PathBuf>,
        callback: Option<EventCallback>,
        context: Option<Context>,
    ) -> Result<Self> {
        let core = MonitorCore::new(paths, callback, context)?;
        Ok(Self::from_parts(core, backend))
    }

    pub fn from_parts(core: MonitorCore, backend: Box<dyn Backend>) -> Self {
        Self { core, backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn core(&self) -> &MonitorCore {
        &self.core
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Replace the whole configuration after validating it.
    pub fn set_config(&mut self, config: MonitorConfig) -> Result<()> {
        config.validate()?;
        self.core.config = config;
        Ok(())
    }

    /// Set the latency in seconds. A rejected value leaves the previous one
    /// in place.
    pub fn set_latency(&mut self, latency: f64) -> Result<()> {
        validate_latency(latency)?;
        self.core.config.latency = latency;
        Ok(())
    }

    pub fn set_recursive(&mut self, recursive: bool) {
        self.core.config.recursive = recursive;
    }

    pub fn set_directory_only(&mut self, directory_only: bool) {
        self.core.config.directory_only = directory_only;
    }

    pub fn set_follow_symlinks(&mut self, follow_symlinks: bool) {
        self.core.config.follow_symlinks = follow_symlinks;
    }

    pub fn set_watch_access(&mut self, watch_access: bool) {
        self.core.config.watch_access = watch_access;
    }

    pub fn set_allow_overflow(&mut self, allow_overflow: bool) {
        self.core.config.allow_overflow = allow_overflow;
    }

    pub fn set_fire_idle_event(&mut self, fire_idle_event: bool) {
        self.core.config.fire_idle_event = fire_idle_event;
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(MonitorError::InvalidProperty(
                "property name must not be empty".to_string(),
            ));
        }
        self.core.config.properties.insert(name, value.into());
        Ok(())
    }

    /// Replace every property. Nothing changes if any name is empty.
    pub fn set_properties(&mut self, properties: BTreeMap<String, String>) -> Result<()> {
        if properties.keys().any(String::is_empty) {
            return Err(MonitorError::InvalidProperty(
                "property name must not be empty".to_string(),
            ));
        }
        self.core.config.properties = properties;
        Ok(())
    }

    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.core.config.properties.get(name).map(String::as_str)
    }

    pub fn add_filter(&mut self, filter: &PathFilter) -> Result<()> {
        let compiled = CompiledFilter::compile(filter)?;
        self.core.path_filters.push(compiled);
        Ok(())
    }

    /// Replace the path filters. The current list is kept unless every
    /// filter compiles.
    pub fn set_filters(&mut self, filters: &[PathFilter]) -> Result<()> {
        self.core.path_filters = PathFilterSet::compile_all(filters)?;
        Ok(())
    }

    pub fn add_event_type_filter(&mut self, filter: EventTypeFilter) {
        self.core.event_type_filters.add(filter);
    }

    pub fn set_event_type_filters(&mut self, filters: &[EventTypeFilter]) {
        self.core.event_type_filters = EventTypeFilterSet::new(filters);
    }

    pub fn set_context(&mut self, context: Option<Context>) {
        self.core.context = context;
    }

    pub fn context(&self) -> Option<&Context> {
        self.core.context.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.core.run_state().running
    }

    /// Run the backend on the calling thread until it exits.
    ///
    /// Returns immediately if the monitor is already running. Errors from the
    /// backend loop are returned here.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.core.run_state();
            if state.running {
                return Ok(());
            }
            state.running = true;
        }

        info!(backend = self.backend.name(), paths = ?self.core.config.paths, "monitor started");
        self.core.reset_last_notification();

        let result = thread::scope(|scope| {
            let idle = if self.core.config.fire_idle_event {
                let spawned = thread::Builder::new()
                    .name("fmonitor-idle".to_string())
                    .spawn_scoped(scope, || idle::run_idle_notifier(&self.core));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        warn!(error = %err, "cannot start idle notifier");
                        None
                    }
                }
            } else {
                None
            };

            let result = self.backend.run(&self.core);

            // Stop the idle notifier before it is joined.
            self.core.run_state().should_stop = true;
            if let Some(handle) = idle {
                if handle.join().is_err() {
                    warn!("idle notifier panicked");
                }
            }

            result
        });

        {
            let mut state = self.core.run_state();
            state.running = false;
            state.should_stop = false;
        }

        match &result {
            Ok(()) => info!(backend = self.backend.name(), "monitor stopped"),
            Err(err) => warn!(backend = self.backend.name(), error = %err, "monitor terminated"),
        }

        result
    }

    /// Ask a running monitor to stop. The backend exits at its next loop
    /// boundary; an in-flight wait is not interrupted.
    pub fn stop(&self) {
        {
            let mut state = self.core.run_state();
            if !state.running || state.should_stop {
                return;
            }
            state.should_stop = true;
        }

        info!(backend = self.backend.name(), "stop requested");
        self.backend.on_stop();
    }
}
