// src/output.rs

//! Rendering of event batches for the command-line front end.
//!
//! A record is either the default layout (`[time ]path[ flags]`) or a user
//! supplied `--format` string. Records are terminated by `\n`, or `\0` with
//! `--print0`.

use std::io::{self, Write};
use std::time::SystemTime;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

use crate::errors::{MonitorError, Result};
use crate::event::{Event, EventFlag};

pub const DEFAULT_TIME_FORMAT: &str = "%c";
pub const DEFAULT_BATCH_MARKER: &str = "NoOp";
pub const DEFAULT_FLAG_SEPARATOR: &str = " ";

/// One piece of a parsed `--format` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatToken {
    Literal(String),
    /// `%p`
    Path,
    /// `%t`
    Time,
    /// `%f`
    Flags,
}

/// A parsed `--format` string.
///
/// Recognised directives are `%p` (path), `%t` (time), `%f` (flags), `%n`
/// (newline) and `%%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFormat {
    tokens: Vec<FormatToken>,
}

impl RecordFormat {
    pub fn parse(format: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = format.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let token = match chars.next() {
                Some('%') => {
                    literal.push('%');
                    continue;
                }
                Some('n') => {
                    literal.push('\n');
                    continue;
                }
                Some('p') => FormatToken::Path,
                Some('t') => FormatToken::Time,
                Some('f') => FormatToken::Flags,
                Some(other) => {
                    return Err(MonitorError::UnknownValue(format!(
                        "unknown format directive: %{other}"
                    )));
                }
                None => {
                    return Err(MonitorError::UnknownValue(
                        "format ends with a lone %".to_string(),
                    ));
                }
            };

            if !literal.is_empty() {
                tokens.push(FormatToken::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
        }

        if !literal.is_empty() {
            tokens.push(FormatToken::Literal(literal));
        }

        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }
}

/// How batches are printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub print0: bool,
    pub timestamp: bool,
    pub utc: bool,
    pub time_format: String,
    pub event_flags: bool,
    pub numeric: bool,
    pub flag_separator: String,
    pub one_per_batch: bool,
    pub batch_marker: Option<String>,
    pub format: Option<RecordFormat>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            print0: false,
            timestamp: false,
            utc: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            event_flags: false,
            numeric: false,
            flag_separator: DEFAULT_FLAG_SEPARATOR.to_string(),
            one_per_batch: false,
            batch_marker: None,
            format: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventFormatter {
    options: OutputOptions,
}

impl EventFormatter {
    /// Fails with `UnknownValue` when the time format is not a valid
    /// strftime string.
    pub fn new(options: OutputOptions) -> Result<Self> {
        validate_time_format(&options.time_format)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    fn terminator(&self) -> char {
        if self.options.print0 { '\0' } else { '\n' }
    }

    pub fn format_time(&self, time: SystemTime) -> String {
        let format = self.options.time_format.as_str();
        if self.options.utc {
            DateTime::<Utc>::from(time).format(format).to_string()
        } else {
            DateTime::<Local>::from(time).format(format).to_string()
        }
    }

    pub fn format_flags(&self, flags: &[EventFlag]) -> String {
        if self.options.numeric {
            EventFlag::mask(flags).to_string()
        } else {
            flags
                .iter()
                .map(|f| f.name())
                .collect::<Vec<_>>()
                .join(&self.options.flag_separator)
        }
    }

    /// One record, without its terminator.
    pub fn format_event(&self, event: &Event) -> String {
        if let Some(format) = &self.options.format {
            return format
                .tokens()
                .iter()
                .map(|token| match token {
                    FormatToken::Literal(text) => text.clone(),
                    FormatToken::Path => event.path().display().to_string(),
                    FormatToken::Time => self.format_time(event.time()),
                    FormatToken::Flags => self.format_flags(event.flags()),
                })
                .collect();
        }

        let mut record = String::new();
        if self.options.timestamp {
            record.push_str(&self.format_time(event.time()));
            record.push(' ');
        }
        record.push_str(&event.path().display().to_string());
        if self.options.event_flags || self.options.numeric {
            record.push(' ');
            record.push_str(&self.format_flags(event.flags()));
        }
        record
    }

    /// Every record of a batch, terminators included.
    pub fn format_batch(&self, events: &[Event]) -> String {
        let terminator = self.terminator();
        let mut out = String::new();

        if self.options.one_per_batch {
            out.push_str(&events.len().to_string());
            out.push(terminator);
        } else {
            for event in events {
                out.push_str(&self.format_event(event));
                out.push(terminator);
            }
        }

        if let Some(marker) = &self.options.batch_marker {
            out.push_str(marker);
            out.push(terminator);
        }

        out
    }

    pub fn write_batch<W: Write>(&self, out: &mut W, events: &[Event]) -> io::Result<()> {
        out.write_all(self.format_batch(events).as_bytes())?;
        out.flush()
    }
}

fn validate_time_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(MonitorError::UnknownValue(format!(
            "invalid time format: {format}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn event() -> Event {
        Event::new(
            "/w/a.txt",
            UNIX_EPOCH + Duration::from_secs(86_400),
            vec![EventFlag::Created, EventFlag::IsFile],
        )
    }

    fn formatter(options: OutputOptions) -> EventFormatter {
        EventFormatter::new(options).unwrap()
    }

    #[test]
    fn default_record_is_the_path() {
        let f = formatter(OutputOptions::default());
        assert_eq!(f.format_batch(&[event()]), "/w/a.txt\n");
    }

    #[test]
    fn flags_timestamp_and_separator() {
        let f = formatter(OutputOptions {
            timestamp: true,
            utc: true,
            time_format: "%Y-%m-%d".to_string(),
            event_flags: true,
            flag_separator: ",".to_string(),
            ..OutputOptions::default()
        });
        assert_eq!(f.format_event(&event()), "1970-01-02 /w/a.txt Created,IsFile");
    }

    #[test]
    fn numeric_mask() {
        let f = formatter(OutputOptions {
            numeric: true,
            ..OutputOptions::default()
        });
        assert_eq!(f.format_event(&event()), "/w/a.txt 514");
    }

    #[test]
    fn one_per_batch_with_marker_and_nul() {
        let f = formatter(OutputOptions {
            print0: true,
            one_per_batch: true,
            batch_marker: Some(DEFAULT_BATCH_MARKER.to_string()),
            ..OutputOptions::default()
        });
        assert_eq!(f.format_batch(&[event(), event()]), "2\0NoOp\0");
    }

    #[test]
    fn custom_record_format() {
        let f = formatter(OutputOptions {
            utc: true,
            time_format: "%H:%M".to_string(),
            format: Some(RecordFormat::parse("[%t] %p: %f 100%%").unwrap()),
            ..OutputOptions::default()
        });
        assert_eq!(f.format_event(&event()), "[00:00] /w/a.txt: Created IsFile 100%");
    }

    #[test]
    fn bad_formats_are_rejected() {
        assert!(RecordFormat::parse("%q").is_err());
        assert!(RecordFormat::parse("%p %").is_err());
        assert!(
            EventFormatter::new(OutputOptions {
                time_format: "%Y-%".to_string(),
                ..OutputOptions::default()
            })
            .is_err()
        );
    }
}
