// src/backend/poll.rs

//! Polling backend: periodically walks the watched trees and diffs the
//! modification and change times against the previous walk.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::errors::Result;
use crate::event::{Event, EventFlag};
use crate::fs::{FileSystem, NodeStat, RealFileSystem};
use crate::monitor::{Backend, MonitorCore, TreeWalker};

pub const POLL_MONITOR_NAME: &str = "poll_monitor";

/// Shortest interval between two walks, whatever the latency.
pub const MIN_POLL_LATENCY: Duration = Duration::from_secs(1);

/// Timestamps recorded for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedFileInfo {
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl From<&NodeStat> for WatchedFileInfo {
    fn from(stat: &NodeStat) -> Self {
        Self {
            mtime: stat.mtime,
            ctime: stat.ctime,
        }
    }
}

pub type Snapshot = HashMap<PathBuf, WatchedFileInfo>;

pub struct PollBackend {
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for PollBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollBackend").field("fs", &self.fs).finish()
    }
}

impl Default for PollBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PollBackend {
    pub fn new() -> Self {
        Self::with_fs(Arc::new(RealFileSystem))
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Backend for PollBackend {
    fn name(&self) -> &'static str {
        POLL_MONITOR_NAME
    }

    fn run(&self, core: &MonitorCore) -> Result<()> {
        let walker = TreeWalker::new(self.fs.as_ref(), core, true);
        let interval = core.latency().max(MIN_POLL_LATENCY);

        let mut state = PollState::default();
        state.initial_scan(&walker);
        debug!(tracked = state.previous().len(), "initial poll scan done");

        loop {
            if core.should_stop() {
                break;
            }

            thread::sleep(interval);

            state.collect_data(&walker, SystemTime::now());
            let events = state.take_events();
            if !events.is_empty() {
                core.notify_events(&events);
            }
        }

        Ok(())
    }
}

/// The two snapshot generations plus the events found by the last cycle.
#[derive(Debug, Default)]
pub struct PollState {
    previous: Snapshot,
    new: Snapshot,
    events: Vec<Event>,
}

impl PollState {
    /// Record every root without generating events.
    pub fn initial_scan(&mut self, walker: &TreeWalker<'_>) {
        let previous = &mut self.previous;

        for root in &walker.core.config().paths {
            walker.walk(root, true, &mut |path: &Path, stat: &NodeStat| {
                if previous.contains_key(path) {
                    return false;
                }
                previous.insert(path.to_path_buf(), stat.into());
                true
            });
        }
    }

    /// Walk every root into a fresh generation and diff it against the
    /// previous one.
    pub fn collect_data(&mut self, walker: &TreeWalker<'_>, now: SystemTime) {
        let Self {
            previous,
            new,
            events,
        } = self;

        for root in &walker.core.config().paths {
            walker.walk(root, true, &mut |path: &Path, stat: &NodeStat| {
                if new.contains_key(path) {
                    return false;
                }

                let info = WatchedFileInfo::from(stat);
                new.insert(path.to_path_buf(), info);

                match previous.remove(path) {
                    Some(old) => {
                        let mut flags = Vec::new();
                        if info.mtime > old.mtime {
                            flags.push(EventFlag::Updated);
                        }
                        if info.ctime > old.ctime {
                            flags.push(EventFlag::AttributeModified);
                        }
                        if !flags.is_empty() {
                            events.push(Event::new(path, now, flags));
                        }
                    }
                    None => events.push(Event::new(path, now, vec![EventFlag::Created])),
                }

                true
            });
        }

        for (path, _) in previous.drain() {
            events.push(Event::new(path, now, vec![EventFlag::Removed]));
        }

        *previous = mem::take(new);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    pub fn current(&self) -> &Snapshot {
        &self.new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::monitor::core::tests::recording_core;

    fn setup() -> (MockFileSystem, MonitorCore) {
        let fs = MockFileSystem::new();
        fs.add_file("/w/a.txt");
        fs.add_file("/w/sub/b.txt");
        let (mut core, _) = recording_core(&["/w"]);
        core.config.recursive = true;
        (fs, core)
    }

    fn events_for(events: &[Event], path: &str) -> Vec<EventFlag> {
        events
            .iter()
            .filter(|e| e.path() == Path::new(path))
            .flat_map(|e| e.flags().iter().copied())
            .collect()
    }

    #[test]
    fn initial_scan_records_without_events() {
        let (fs, core) = setup();
        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();

        state.initial_scan(&walker);

        assert_eq!(state.previous().len(), 4);
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn unchanged_tree_yields_no_events() {
        let (fs, core) = setup();
        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();
        state.initial_scan(&walker);

        state.collect_data(&walker, SystemTime::now());

        assert!(state.take_events().is_empty());
        assert_eq!(state.previous().len(), 4);
        assert!(state.current().is_empty());
    }

    #[test]
    fn created_updated_and_attribute_changes() {
        let (fs, core) = setup();
        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();
        state.initial_scan(&walker);

        fs.add_file("/w/new.txt");
        fs.write("/w/a.txt");
        fs.chmod("/w/sub/b.txt");
        state.collect_data(&walker, SystemTime::now());
        let events = state.take_events();

        assert_eq!(events_for(&events, "/w/new.txt"), vec![EventFlag::Created]);
        assert_eq!(
            events_for(&events, "/w/a.txt"),
            vec![EventFlag::Updated, EventFlag::AttributeModified]
        );
        assert_eq!(
            events_for(&events, "/w/sub/b.txt"),
            vec![EventFlag::AttributeModified]
        );
    }

    #[test]
    fn removed_path_is_reported_once_and_forgotten() {
        let (fs, core) = setup();
        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();
        state.initial_scan(&walker);

        fs.remove("/w/a.txt");
        state.collect_data(&walker, SystemTime::now());
        let events = state.take_events();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path(), Path::new("/w/a.txt"));
        assert_eq!(events[0].flags(), &[EventFlag::Removed]);
        assert!(!state.previous().contains_key(Path::new("/w/a.txt")));
        assert!(!state.current().contains_key(Path::new("/w/a.txt")));

        state.collect_data(&walker, SystemTime::now());
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn removed_directory_reports_its_subtree() {
        let (fs, core) = setup();
        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();
        state.initial_scan(&walker);

        fs.remove("/w/sub");
        state.collect_data(&walker, SystemTime::now());
        let events = state.take_events();

        assert_eq!(events_for(&events, "/w/sub"), vec![EventFlag::Removed]);
        assert_eq!(events_for(&events, "/w/sub/b.txt"), vec![EventFlag::Removed]);
    }

    #[test]
    fn symlink_loop_is_tracked_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/a.txt");
        fs.add_symlink("/w/loop", "/w");
        let (mut core, _) = recording_core(&["/w"]);
        core.config.recursive = true;
        core.config.follow_symlinks = true;

        let walker = TreeWalker::new(&fs, &core, true);
        let mut state = PollState::default();
        state.initial_scan(&walker);
        assert_eq!(state.previous().len(), 2);

        state.collect_data(&walker, SystemTime::now());
        assert!(state.take_events().is_empty());
    }
}
