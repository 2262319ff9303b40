// src/event.rs

//! Change events delivered to the monitor callback.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;

/// Kind of change detected for a path.
///
/// Each variant carries a distinct bit so a set of flags can be reported as a
/// single number (see [`EventFlag::mask`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum EventFlag {
    /// No change; used by idle events.
    NoOp = 0,
    /// A backend event that has no portable meaning.
    PlatformSpecific = 1 << 0,
    Created = 1 << 1,
    Updated = 1 << 2,
    Removed = 1 << 3,
    Renamed = 1 << 4,
    OwnerModified = 1 << 5,
    AttributeModified = 1 << 6,
    MovedFrom = 1 << 7,
    MovedTo = 1 << 8,
    IsFile = 1 << 9,
    IsDir = 1 << 10,
    IsSymLink = 1 << 11,
    /// The link count changed.
    Link = 1 << 12,
    /// The notification queue dropped events.
    Overflow = 1 << 13,
}

impl EventFlag {
    pub const ALL: [EventFlag; 15] = [
        EventFlag::NoOp,
        EventFlag::PlatformSpecific,
        EventFlag::Created,
        EventFlag::Updated,
        EventFlag::Removed,
        EventFlag::Renamed,
        EventFlag::OwnerModified,
        EventFlag::AttributeModified,
        EventFlag::MovedFrom,
        EventFlag::MovedTo,
        EventFlag::IsFile,
        EventFlag::IsDir,
        EventFlag::IsSymLink,
        EventFlag::Link,
        EventFlag::Overflow,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            EventFlag::NoOp => "NoOp",
            EventFlag::PlatformSpecific => "PlatformSpecific",
            EventFlag::Created => "Created",
            EventFlag::Updated => "Updated",
            EventFlag::Removed => "Removed",
            EventFlag::Renamed => "Renamed",
            EventFlag::OwnerModified => "OwnerModified",
            EventFlag::AttributeModified => "AttributeModified",
            EventFlag::MovedFrom => "MovedFrom",
            EventFlag::MovedTo => "MovedTo",
            EventFlag::IsFile => "IsFile",
            EventFlag::IsDir => "IsDir",
            EventFlag::IsSymLink => "IsSymLink",
            EventFlag::Link => "Link",
            EventFlag::Overflow => "Overflow",
        }
    }

    /// Bitwise OR of every flag in `flags`.
    pub fn mask(flags: &[EventFlag]) -> u32 {
        flags.iter().fold(0, |acc, f| acc | f.bits())
    }
}

impl fmt::Display for EventFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventFlag {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.name() == s)
            .ok_or_else(|| MonitorError::UnknownValue(format!("unknown event type: {s}")))
    }
}

/// Immutable record of a change to a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    path: PathBuf,
    time: SystemTime,
    flags: Vec<EventFlag>,
}

impl Event {
    /// Build an event. Duplicate flags are collapsed, first occurrence wins
    /// the position.
    pub fn new(path: impl Into<PathBuf>, time: SystemTime, flags: Vec<EventFlag>) -> Self {
        let mut unique = Vec::with_capacity(flags.len());
        for flag in flags {
            if !unique.contains(&flag) {
                unique.push(flag);
            }
        }

        Self {
            path: path.into(),
            time,
            flags: unique,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn time(&self) -> SystemTime {
        self.time
    }

    pub fn flags(&self) -> &[EventFlag] {
        &self.flags
    }

    pub fn has_flag(&self, flag: EventFlag) -> bool {
        self.flags.contains(&flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IntoDeserializer;
    use serde::de::value::Error as ValueError;

    #[test]
    fn names_round_trip_through_from_str() {
        for flag in EventFlag::ALL {
            assert_eq!(flag.name().parse::<EventFlag>().unwrap(), flag);
        }
        assert!("Bogus".parse::<EventFlag>().is_err());
    }

    #[test]
    fn flags_deserialize_by_name() {
        let de: serde::de::value::StrDeserializer<'_, ValueError> =
            "AttributeModified".into_deserializer();
        assert_eq!(EventFlag::deserialize(de).unwrap(), EventFlag::AttributeModified);
    }

    #[test]
    fn mask_ors_bits() {
        let mask = EventFlag::mask(&[EventFlag::Created, EventFlag::IsDir]);
        assert_eq!(mask, (1 << 1) | (1 << 10));
        assert_eq!(EventFlag::mask(&[EventFlag::NoOp]), 0);
    }

    #[test]
    fn event_collapses_duplicate_flags() {
        let ev = Event::new(
            "/w/a.txt",
            SystemTime::UNIX_EPOCH,
            vec![EventFlag::Updated, EventFlag::Created, EventFlag::Updated],
        );
        assert_eq!(ev.flags(), &[EventFlag::Updated, EventFlag::Created]);
        assert!(ev.has_flag(EventFlag::Created));
        assert!(!ev.has_flag(EventFlag::Removed));
    }
}
