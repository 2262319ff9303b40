// src/filter/mod.rs

//! Path and event-type filtering.
//!
//! This module is responsible for:
//! - Compiling [`PathFilter`] regex rules into a [`PathFilterSet`].
//! - Deciding whether a path is accepted (include/exclude walk).
//! - Reducing event flags against an event-type allow-list.
//! - Reading filters from the line-oriented filter file format ([`parser`]).

pub mod basic;
pub mod parser;

use std::fmt;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{MonitorError, Result};
use crate::event::EventFlag;

pub use parser::{parse_filter_line, parse_filters, read_filters_from_file, FilterLine};

/// Whether a matching filter includes or excludes the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Include,
    Exclude,
}

/// A regex rule over event paths, as configured by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFilter {
    pub text: String,
    pub filter_type: FilterType,
    pub case_sensitive: bool,
    pub extended: bool,
}

impl PathFilter {
    pub fn include(text: impl Into<String>) -> Self {
        Self::new(text, FilterType::Include)
    }

    pub fn exclude(text: impl Into<String>) -> Self {
        Self::new(text, FilterType::Exclude)
    }

    fn new(text: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            text: text.into(),
            filter_type,
            case_sensitive: true,
            extended: false,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }
}

/// Allow-list entry for event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeFilter {
    pub flag: EventFlag,
}

impl From<EventFlag> for EventTypeFilter {
    fn from(flag: EventFlag) -> Self {
        Self { flag }
    }
}

/// A [`PathFilter`] after regex compilation.
#[derive(Clone)]
pub struct CompiledFilter {
    regex: Regex,
    filter_type: FilterType,
}

impl fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("regex", &self.regex.as_str())
            .field("filter_type", &self.filter_type)
            .finish()
    }
}

impl CompiledFilter {
    pub fn compile(filter: &PathFilter) -> Result<Self> {
        let pattern = if filter.extended {
            filter.text.clone()
        } else {
            basic::to_extended(&filter.text)
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!filter.case_sensitive)
            .build()
            .map_err(|source| MonitorError::InvalidRegex {
                pattern: filter.text.clone(),
                source,
            })?;

        Ok(Self {
            regex,
            filter_type: filter.filter_type,
        })
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Ordered list of compiled path filters.
#[derive(Debug, Clone, Default)]
pub struct PathFilterSet {
    filters: Vec<CompiledFilter>,
}

impl PathFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every filter; nothing is returned unless all of them compile.
    pub fn compile_all(filters: &[PathFilter]) -> Result<Self> {
        let filters = filters
            .iter()
            .map(CompiledFilter::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    pub fn push(&mut self, filter: CompiledFilter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledFilter> {
        self.filters.iter()
    }

    /// An include match accepts immediately; an exclude match rejects unless a
    /// later include matches; no match at all accepts.
    pub fn accepts(&self, path: &str) -> bool {
        let mut excluded = false;

        for filter in &self.filters {
            if !filter.is_match(path) {
                continue;
            }
            match filter.filter_type {
                FilterType::Include => return true,
                FilterType::Exclude => excluded = true,
            }
        }

        !excluded
    }

    pub fn accepts_path(&self, path: &Path) -> bool {
        self.accepts(&path.to_string_lossy())
    }
}

/// Event-type allow-list. Empty means every flag is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTypeFilterSet {
    allowed: Vec<EventFlag>,
}

impl EventTypeFilterSet {
    pub fn new(filters: &[EventTypeFilter]) -> Self {
        let mut set = Self::default();
        for filter in filters {
            set.add(*filter);
        }
        set
    }

    pub fn add(&mut self, filter: EventTypeFilter) {
        if !self.allowed.contains(&filter.flag) {
            self.allowed.push(filter.flag);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn accepts(&self, flag: EventFlag) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&flag)
    }

    /// The subset of `flags` that passes the allow-list, in input order.
    pub fn filter_flags(&self, flags: &[EventFlag]) -> Vec<EventFlag> {
        flags.iter().copied().filter(|f| self.accepts(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(filters: &[PathFilter]) -> PathFilterSet {
        PathFilterSet::compile_all(filters).unwrap()
    }

    #[test]
    fn empty_set_accepts_everything() {
        assert!(PathFilterSet::new().accepts("/anything"));
    }

    #[test]
    fn exclude_only_rejects_matches() {
        let s = set(&[PathFilter::exclude(r"\.tmp$")]);
        assert!(!s.accepts("/w/a.tmp"));
        assert!(s.accepts("/w/a.txt"));
    }

    #[test]
    fn include_wins_over_earlier_exclude() {
        let s = set(&[
            PathFilter::exclude(".*"),
            PathFilter::include(r"\.txt$"),
        ]);
        assert!(s.accepts("/w/a.txt"));
        assert!(!s.accepts("/w/a.rs"));
    }

    #[test]
    fn include_before_exclude_short_circuits() {
        let s = set(&[
            PathFilter::include(r"\.txt$"),
            PathFilter::exclude(".*"),
        ]);
        assert!(s.accepts("/w/a.txt"));
        assert!(!s.accepts("/w/a.rs"));
    }

    #[test]
    fn case_insensitive_filter() {
        let s = set(&[PathFilter::exclude(r"\.TMP$").case_insensitive()]);
        assert!(!s.accepts("/w/a.tmp"));
    }

    #[test]
    fn basic_syntax_treats_plus_as_literal() {
        let s = set(&[PathFilter::exclude("a+b")]);
        assert!(!s.accepts("/w/a+b"));
        assert!(s.accepts("/w/aab"));

        let e = set(&[PathFilter::exclude("a+b").extended()]);
        assert!(!e.accepts("/w/aab"));
    }

    #[test]
    fn invalid_regex_reports_pattern() {
        let err = CompiledFilter::compile(&PathFilter::include("(").extended()).unwrap_err();
        match err {
            MonitorError::InvalidRegex { pattern, .. } => assert_eq!(pattern, "("),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn event_type_allow_list() {
        let all = EventTypeFilterSet::default();
        assert_eq!(
            all.filter_flags(&[EventFlag::NoOp]),
            vec![EventFlag::NoOp]
        );

        let only_created = EventTypeFilterSet::new(&[EventFlag::Created.into()]);
        assert_eq!(
            only_created.filter_flags(&[EventFlag::Updated, EventFlag::Created]),
            vec![EventFlag::Created]
        );
        assert!(only_created.filter_flags(&[EventFlag::Removed]).is_empty());
    }
}
