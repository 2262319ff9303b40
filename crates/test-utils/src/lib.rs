pub mod recorder;

pub use recorder::EventRecorder;

use std::sync::{Arc, Once};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use file_monitor::Monitor;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// A monitor running `start()` on its own thread.
pub struct MonitorThread {
    monitor: Arc<Monitor>,
    handle: Option<JoinHandle<file_monitor::errors::Result<()>>>,
}

impl MonitorThread {
    /// Start `monitor` and wait until it reports running.
    pub fn spawn(monitor: Monitor) -> Self {
        let monitor = Arc::new(monitor);
        let runner = Arc::clone(&monitor);
        let handle = thread::spawn(move || runner.start());

        for _ in 0..200 {
            if monitor.is_running() || handle.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        Self {
            monitor,
            handle: Some(handle),
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Request a stop and wait for `start()` to return its result.
    pub fn stop_and_join(mut self) -> Result<()> {
        self.monitor.stop();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("monitor thread already joined"))?;
        handle
            .join()
            .map_err(|_| anyhow!("monitor thread panicked"))?
            .map_err(anyhow::Error::from)
    }
}

impl Drop for MonitorThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.monitor.stop();
            let _ = handle.join();
        }
    }
}
