// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Include and exclude filters are evaluated in command-line order, which the
//! derive API does not keep across two separate `Vec`s; [`parse`] recovers it
//! from the argument indices.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

use crate::errors::MonitorError;
use crate::event::EventFlag;
use crate::filter::{EventTypeFilter, FilterType, PathFilter};
use crate::output::{DEFAULT_BATCH_MARKER, DEFAULT_FLAG_SEPARATOR, DEFAULT_TIME_FORMAT};

/// Usage errors; also what `clap` exits with on a bad command line.
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_LATENCY: i32 = 3;
pub const EXIT_ERROR: i32 = 5;
pub const EXIT_OPTION: i32 = 7;
pub const EXIT_MONITOR_NAME: i32 = 8;
pub const EXIT_FORMAT: i32 = 9;

/// Command-line arguments for `fmonitor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fmonitor",
    version,
    about = "Report changes to files and directories.",
    long_about = None
)]
pub struct CliArgs {
    /// Files or directories to watch.
    #[arg(value_name = "PATH", required_unless_present = "list_monitors")]
    pub paths: Vec<PathBuf>,

    /// Use the ASCII NUL character as record separator.
    #[arg(short = '0', long)]
    pub print0: bool,

    /// Exit after the first batch of events is received.
    #[arg(short = '1', long)]
    pub one_event: bool,

    /// Report queue overflows as events instead of failing.
    #[arg(long)]
    pub allow_overflow: bool,

    /// Print a marker after every batch.
    #[arg(
        long,
        value_name = "MARKER",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_BATCH_MARKER
    )]
    pub batch_marker: Option<String>,

    /// Watch file accesses.
    #[arg(short = 'a', long)]
    pub access: bool,

    /// Watch directories only.
    #[arg(short = 'd', long)]
    pub directories: bool,

    /// Exclude paths matching REGEX.
    #[arg(short = 'e', long, value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Use extended regular expressions.
    #[arg(short = 'E', long)]
    pub extended: bool,

    /// Load filters from FILE.
    #[arg(long, value_name = "FILE")]
    pub filter_from: Option<PathBuf>,

    /// Record format (%p path, %t time, %f flags, %n newline, %% percent).
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Print the event time using the given strftime FORMAT.
    #[arg(short = 'f', long, value_name = "FORMAT", default_value = DEFAULT_TIME_FORMAT)]
    pub format_time: String,

    /// Fire an idle event when nothing happened for a while.
    #[arg(long)]
    pub fire_idle_event: bool,

    /// Include paths matching REGEX.
    #[arg(short = 'i', long, value_name = "REGEX")]
    pub include: Vec<String>,

    /// Use case insensitive regular expressions.
    #[arg(short = 'I', long)]
    pub insensitive: bool,

    /// Latency in seconds.
    #[arg(short = 'l', long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub latency: Option<f64>,

    /// Follow symbolic links.
    #[arg(short = 'L', long)]
    pub follow_links: bool,

    /// List the available monitors and exit.
    #[arg(short = 'M', long)]
    pub list_monitors: bool,

    /// Use the monitor with the given NAME.
    #[arg(short = 'm', long, value_name = "NAME")]
    pub monitor: Option<String>,

    /// Set a monitor property.
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_property)]
    pub monitor_property: Vec<(String, String)>,

    /// Print a numeric event mask.
    #[arg(short = 'n', long)]
    pub numeric: bool,

    /// Print a single record with the number of events in each batch.
    #[arg(short = 'o', long)]
    pub one_per_batch: bool,

    /// Recurse into subdirectories.
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Print the event timestamp.
    #[arg(short = 't', long)]
    pub timestamp: bool,

    /// Print the event time as UTC.
    #[arg(short = 'u', long)]
    pub utc_time: bool,

    /// Print the event flags.
    #[arg(short = 'x', long)]
    pub event_flags: bool,

    /// Only report events of TYPE (e.g. Created, Updated).
    #[arg(long = "event", value_name = "TYPE")]
    pub events: Vec<EventFlag>,

    /// Separator between event flag names.
    #[arg(long, value_name = "STRING", default_value = DEFAULT_FLAG_SEPARATOR)]
    pub event_flag_separator: String,

    /// Shorthand for `--log-level debug`.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FMONITOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// `-i`/`-e` patterns in command-line order.
    #[arg(skip)]
    pub ordered_filters: Vec<(FilterType, String)>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// `-i`/`-e` patterns as path filters, honouring `-E` and `-I`.
    pub fn path_filters(&self) -> Vec<PathFilter> {
        self.ordered_filters
            .iter()
            .map(|(filter_type, text)| PathFilter {
                text: text.clone(),
                filter_type: *filter_type,
                case_sensitive: !self.insensitive,
                extended: self.extended,
            })
            .collect()
    }

    pub fn event_type_filters(&self) -> Vec<EventTypeFilter> {
        self.events.iter().copied().map(EventTypeFilter::from).collect()
    }

    /// Effective log level: `--log-level`, then `-v`.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        self.log_level
            .or(self.verbose.then_some(LogLevel::Debug))
    }
}

/// Parse the process arguments, exiting with a usage message on error.
pub fn parse() -> CliArgs {
    try_parse_from(std::env::args_os()).unwrap_or_else(|err| err.exit())
}

pub fn try_parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    let mut cli = CliArgs::from_arg_matches(&matches)?;
    cli.ordered_filters = ordered_filters(&matches);
    Ok(cli)
}

fn ordered_filters(matches: &ArgMatches) -> Vec<(FilterType, String)> {
    let mut filters: Vec<(usize, FilterType, String)> = Vec::new();

    for (id, filter_type) in [("include", FilterType::Include), ("exclude", FilterType::Exclude)] {
        let (Some(indices), Some(values)) = (
            matches.indices_of(id),
            matches.get_many::<String>(id),
        ) else {
            continue;
        };
        filters.extend(
            indices
                .zip(values)
                .map(|(index, value)| (index, filter_type, value.clone())),
        );
    }

    filters.sort_by_key(|(index, _, _)| *index);
    filters
        .into_iter()
        .map(|(_, filter_type, value)| (filter_type, value))
        .collect()
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {s:?}")),
    }
}

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let Some(monitor_err) = err.chain().find_map(|e| e.downcast_ref::<MonitorError>()) else {
        return EXIT_ERROR;
    };

    match monitor_err {
        MonitorError::InvalidLatency(_) => EXIT_LATENCY,
        MonitorError::UnknownMonitorType(_) => EXIT_MONITOR_NAME,
        MonitorError::UnknownValue(_) => EXIT_FORMAT,
        MonitorError::PathsNotSet => EXIT_USAGE,
        MonitorError::InvalidRegex { .. }
        | MonitorError::InvalidFilter(_)
        | MonitorError::InvalidProperty(_) => EXIT_OPTION,
        _ => EXIT_ERROR,
    }
}
