// src/lib.rs

pub mod backend;
pub mod cli;
pub mod errors;
pub mod event;
pub mod factory;
pub mod filter;
pub mod fs;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod types;

pub use crate::errors::{ErrorCode, MonitorError};
pub use crate::event::{Event, EventFlag};
pub use crate::filter::{EventTypeFilter, FilterType, PathFilter};
pub use crate::monitor::{callback, Backend, Context, EventCallback, Monitor, MonitorConfig};
pub use crate::types::MonitorType;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::filter::read_filters_from_file;
use crate::output::{EventFormatter, OutputOptions, RecordFormat};

const STOP_RETRY: Duration = Duration::from_millis(250);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - monitor selection and configuration from the command line
/// - the event printer
/// - the blocking monitor loop
/// - Ctrl-C and `--one-event` shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    if args.list_monitors {
        for name in factory::get_types() {
            println!("{name}");
        }
        return Ok(());
    }

    let formatter = EventFormatter::new(output_options(&args)?)?;
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<()>();

    let one_event = args.one_event;
    let on_events = callback(move |events: &[Event], _| {
        let mut stdout = io::stdout().lock();
        if let Err(err) = formatter.write_batch(&mut stdout, events) {
            warn!(error = %err, "cannot write events");
        }
        if one_event {
            let _ = batch_tx.send(());
        }
    });

    let monitor = Arc::new(build_monitor(&args, on_events)?);

    let mut runner = {
        let monitor = Arc::clone(&monitor);
        tokio::task::spawn_blocking(move || monitor.start())
    };

    tokio::select! {
        finished = &mut runner => {
            finished.context("monitor task panicked")??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Ctrl+C received, stopping monitor");
        }
        _ = batch_rx.recv() => {
            debug!("first batch printed, stopping monitor");
        }
    }

    // A stop that lands before the monitor reports running is a no-op, so
    // repeat it until the runner exits.
    loop {
        monitor.stop();
        match tokio::time::timeout(STOP_RETRY, &mut runner).await {
            Ok(finished) => {
                finished.context("monitor task panicked")??;
                break;
            }
            Err(_) => debug!("monitor still running, repeating stop"),
        }
    }
    io::stdout().flush().context("flushing stdout")?;
    Ok(())
}

fn output_options(args: &CliArgs) -> Result<OutputOptions> {
    let format = args
        .format
        .as_deref()
        .map(RecordFormat::parse)
        .transpose()?;

    Ok(OutputOptions {
        print0: args.print0,
        timestamp: args.timestamp,
        utc: args.utc_time,
        time_format: args.format_time.clone(),
        event_flags: args.event_flags,
        numeric: args.numeric,
        flag_separator: args.event_flag_separator.clone(),
        one_per_batch: args.one_per_batch,
        batch_marker: args.batch_marker.clone(),
        format,
    })
}

/// Create and configure the monitor described by `args`.
fn build_monitor(args: &CliArgs, on_events: EventCallback) -> Result<Monitor> {
    let paths = args.paths.clone();

    let mut monitor = match &args.monitor {
        Some(name) => factory::create_monitor_by_name(name, paths, Some(on_events), None)?
            .ok_or_else(|| MonitorError::UnknownMonitorType(name.clone()))?,
        None => factory::create_monitor(MonitorType::SystemDefault, paths, Some(on_events), None)?,
    };

    if let Some(latency) = args.latency {
        monitor.set_latency(latency)?;
    }
    monitor.set_recursive(args.recursive);
    monitor.set_directory_only(args.directories);
    monitor.set_follow_symlinks(args.follow_links);
    monitor.set_watch_access(args.access);
    monitor.set_allow_overflow(args.allow_overflow);
    monitor.set_fire_idle_event(args.fire_idle_event);

    for (name, value) in &args.monitor_property {
        monitor.set_property(name.as_str(), value.as_str())?;
    }

    for filter in args.path_filters() {
        monitor.add_filter(&filter)?;
    }

    if let Some(file) = &args.filter_from {
        let mut report = |line: &str| eprintln!("fmonitor: invalid filter: {line}");
        let filters = read_filters_from_file(file, Some(&mut report))
            .with_context(|| format!("reading filters from {}", file.display()))?;
        for filter in &filters {
            monitor.add_filter(filter)?;
        }
    }

    monitor.set_event_type_filters(&args.event_type_filters());

    debug!(backend = monitor.backend_name(), config = ?monitor.config(), "monitor configured");
    Ok(monitor)
}
