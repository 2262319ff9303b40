// src/monitor/idle.rs

use std::thread;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::event::{Event, EventFlag};
use crate::monitor::core::MonitorCore;

/// Longest single sleep, so a stop request is noticed promptly.
const MAX_IDLE_SLEEP: Duration = Duration::from_secs(2);

/// Idle threshold as a multiple of the latency.
const IDLE_FACTOR: f64 = 1.1;

/// Floor for the threshold; a zero latency would otherwise spin.
const MIN_IDLE_THRESHOLD: Duration = Duration::from_millis(10);

/// 110% of `latency`, saturating, and never below [`MIN_IDLE_THRESHOLD`].
fn idle_threshold(latency: Duration) -> Duration {
    Duration::try_from_secs_f64(latency.as_secs_f64() * IDLE_FACTOR)
        .unwrap_or(Duration::MAX)
        .max(MIN_IDLE_THRESHOLD)
}

/// Emit a `NoOp` event with an empty path whenever nothing has been notified
/// for 110% of the latency. Returns once a stop is requested.
pub(crate) fn run_idle_notifier(core: &MonitorCore) {
    let threshold = idle_threshold(core.latency());
    debug!(?threshold, "idle notifier started");

    while !core.should_stop() {
        let elapsed = core.since_last_notification();

        if elapsed >= threshold {
            debug!("firing idle event");
            core.notify_events(&[Event::new("", SystemTime::now(), vec![EventFlag::NoOp])]);
            continue;
        }

        thread::sleep((threshold - elapsed).min(MAX_IDLE_SLEEP));
    }

    debug!("idle notifier stopped");
}
