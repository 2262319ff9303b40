// src/filter/parser.rs

//! Filter file format.
//!
//! One filter per line:
//!
//! ```text
//! # comment
//! +  .*\.txt$
//! -i .*\.TMP$
//! ```
//!
//! A line matches `^([+-])([ei]*) (.+)$`: `+` includes, `-` excludes, `e`
//! selects extended regex syntax, `i` makes the match case insensitive.
//! Unescaped trailing spaces are trimmed from the pattern.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{MonitorError, Result};
use crate::filter::{FilterType, PathFilter};

static FILTER_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])([ei]*) (.+)$").expect("filter grammar is a valid regex")
});

/// Result of parsing one line of a filter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterLine {
    Filter(PathFilter),
    /// Blank line or comment.
    Skip,
    /// The line does not follow the grammar, or its pattern is empty.
    Malformed,
}

/// Parse a single filter line.
///
/// Only an unknown type or flag character is a hard error; every other
/// problem is reported as [`FilterLine::Malformed`].
pub fn parse_filter_line(line: &str) -> Result<FilterLine> {
    if line.is_empty() || line.starts_with('#') {
        return Ok(FilterLine::Skip);
    }

    let Some(fragments) = FILTER_GRAMMAR.captures(line) else {
        return Ok(FilterLine::Malformed);
    };

    let filter_type = match &fragments[1] {
        "+" => FilterType::Include,
        "-" => FilterType::Exclude,
        other => {
            return Err(MonitorError::InvalidFilter(format!(
                "unknown filter type: {other}"
            )));
        }
    };

    let mut filter = PathFilter {
        text: String::new(),
        filter_type,
        case_sensitive: true,
        extended: false,
    };

    for c in fragments[2].chars() {
        match c {
            'e' => filter.extended = true,
            'i' => filter.case_sensitive = false,
            other => {
                return Err(MonitorError::InvalidFilter(format!("unknown flag: {other}")));
            }
        }
    }

    let text = trim_unescaped_trailing_spaces(&fragments[3]);
    if text.is_empty() || text == " " {
        return Ok(FilterLine::Malformed);
    }

    filter.text = text.to_string();
    Ok(FilterLine::Filter(filter))
}

/// Parse every line of `contents`, routing malformed lines to `on_error`.
pub fn parse_filters(
    contents: &str,
    mut on_error: Option<&mut dyn FnMut(&str)>,
) -> Result<Vec<PathFilter>> {
    let mut filters = Vec::new();

    for line in contents.lines() {
        match parse_filter_line(line)? {
            FilterLine::Filter(filter) => filters.push(filter),
            FilterLine::Skip => {}
            FilterLine::Malformed => {
                debug!(line, "skipping malformed filter line");
                if let Some(handler) = on_error.as_mut() {
                    handler(line);
                }
            }
        }
    }

    Ok(filters)
}

/// Load filters from a file. A file that cannot be read is a hard error.
pub fn read_filters_from_file(
    path: impl AsRef<Path>,
    on_error: Option<&mut dyn FnMut(&str)>,
) -> Result<Vec<PathFilter>> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_filters(&contents, on_error)
}

/// Drop trailing spaces that are not escaped by an odd run of backslashes.
/// The first character is never removed.
fn trim_unescaped_trailing_spaces(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut end = bytes.len();

    while end > 1 && is_unescaped_space(bytes, end - 1) {
        end -= 1;
    }

    &text[..end]
}

fn is_unescaped_space(bytes: &[u8], i: usize) -> bool {
    if bytes[i] != b' ' {
        return false;
    }
    let backslashes = bytes[..i].iter().rev().take_while(|b| **b == b'\\').count();
    backslashes % 2 == 0
}
