// src/backend/inotify.rs

//! Event-driven backend on top of Linux inotify.
//!
//! Directories are watched individually; files are covered by the watch on
//! their parent. Each loop iteration:
//! 1. drains the work queued by the previous read (stale watches, new
//!    directories to scan),
//! 2. scans any root that is not watched yet,
//! 3. waits on the inotify descriptor for at most one latency period,
//! 4. translates every record read and notifies the batch.
//!
//! Known race: when a watched object is deleted and a new one is created
//! under the same path before the next read, the new object is only picked
//! up once a later scan reaches it, and events in between are lost.
//!
//! Scans add a directory's watch before listing it, so the listing itself
//! produces open and close records on that directory. Every start and every
//! rescan therefore reports `IsDir` and `PlatformSpecific` events for the
//! scanned directories.
//!
//! All records read in one pass are merged per path: a batch holds at most
//! one event per path, carrying the union of its flags.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use tracing::{debug, trace, warn};

use crate::backend::watch_table::WatchTable;
use crate::errors::{MonitorError, Result};
use crate::event::{Event, EventFlag};
use crate::fs::{NodeStat, RealFileSystem};
use crate::monitor::{Backend, MonitorCore, TreeWalker};

pub const INOTIFY_MONITOR_NAME: &str = "inotify_monitor";

/// Room for 100 records carrying a maximal file name.
const BUFFER_SIZE: usize = 100 * (16 + 255 + 1);

pub struct InotifyBackend {
    fs: RealFileSystem,
    state: Mutex<InotifyState>,
}

struct InotifyState {
    inotify: Inotify,
    watches: WatchTable<WatchDescriptor>,
    pending: PendingWork,
    buffer: Vec<u8>,
}

/// Bookkeeping collected while reading, applied before the next scan.
#[derive(Default)]
struct PendingWork {
    descriptors_to_remove: HashSet<WatchDescriptor>,
    watches_to_remove: HashSet<WatchDescriptor>,
    paths_to_rescan: Vec<PathBuf>,
}

impl InotifyBackend {
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init().map_err(|err| {
            MonitorError::Notification(format!("cannot create inotify instance: {err}"))
        })?;

        Ok(Self {
            fs: RealFileSystem,
            state: Mutex::new(InotifyState {
                inotify,
                watches: WatchTable::new(),
                pending: PendingWork::default(),
                buffer: vec![0; BUFFER_SIZE],
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, InotifyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for InotifyBackend {
    fn name(&self) -> &'static str {
        INOTIFY_MONITOR_NAME
    }

    fn run(&self, core: &MonitorCore) -> Result<()> {
        let walker = TreeWalker::new(&self.fs, core, false);
        let mask = watch_mask(core.config().watch_access);
        let latency = core.latency();
        let mut state = self.state();

        loop {
            if core.should_stop() {
                break;
            }

            state.process_pending(&walker, mask);
            state.scan_roots(&walker, mask);

            if state.watches.is_empty() {
                thread::sleep(latency);
                continue;
            }

            match wait_readable(state.inotify.as_raw_fd(), latency) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    debug!(error = %err, "select on inotify descriptor failed");
                    continue;
                }
            }

            let events = state.read_batch(core)?;
            core.notify_events(&events);

            thread::sleep(latency);
        }

        Ok(())
    }
}

impl InotifyState {
    fn scan(&mut self, walker: &TreeWalker<'_>, path: &Path, mask: WatchMask) {
        let Self {
            inotify, watches, ..
        } = self;

        walker.walk(path, true, &mut |path: &Path, _stat: &NodeStat| {
            if watches.contains_path(path) {
                return false;
            }

            match inotify.watches().add(path, mask) {
                Ok(wd) => {
                    trace!(path = %path.display(), ?wd, "watch added");
                    watches.insert(wd, path.to_path_buf());
                    true
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cannot watch path");
                    false
                }
            }
        });
    }

    fn scan_roots(&mut self, walker: &TreeWalker<'_>, mask: WatchMask) {
        for root in &walker.core.config().paths {
            if !self.watches.contains_path(root) {
                self.scan(walker, root, mask);
            }
        }
    }

    fn process_pending(&mut self, walker: &TreeWalker<'_>, mask: WatchMask) {
        for wd in mem::take(&mut self.pending.watches_to_remove) {
            if let Err(err) = self.inotify.watches().remove(wd.clone()) {
                warn!(?wd, error = %err, "cannot remove watch");
            }
        }

        for wd in mem::take(&mut self.pending.descriptors_to_remove) {
            if let Some(path) = self.watches.remove_descriptor(&wd) {
                debug!(path = %path.display(), ?wd, "forgetting watch");
            }
        }

        for path in mem::take(&mut self.pending.paths_to_rescan) {
            self.scan(walker, &path, mask);
        }
    }

    /// Read whatever is queued and translate it into events.
    fn read_batch(&mut self, core: &MonitorCore) -> Result<Vec<Event>> {
        let Self {
            inotify,
            watches,
            pending,
            buffer,
        } = self;

        let records = match inotify.read_events(buffer) {
            Ok(records) => records,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(MonitorError::Notification(format!(
                    "reading inotify events: {err}"
                )));
            }
        };

        let now = SystemTime::now();
        let mut changes = Vec::new();

        for record in records {
            trace!(wd = ?record.wd, mask = ?record.mask, name = ?record.name, "inotify record");

            let watched = watches.path(&record.wd).map(Path::to_path_buf);

            if record.mask.contains(EventMask::Q_OVERFLOW) {
                core.notify_overflow(watched.as_deref().unwrap_or(Path::new("")))?;
            }

            let Some(watched) = watched else {
                debug!(wd = ?record.wd, "record for unknown watch descriptor");
                continue;
            };

            let actions = translate(record.mask, &watched, record.name);

            changes.extend(actions.events);
            if let Some(dir) = actions.rescan.filter(|_| core.config().recursive) {
                pending.paths_to_rescan.push(dir);
            }
            if actions.remove_watch {
                pending.watches_to_remove.insert(record.wd.clone());
            }
            if actions.forget_descriptor {
                pending.descriptors_to_remove.insert(record.wd.clone());
            }
        }

        Ok(coalesce(changes, now))
    }
}

impl Drop for InotifyBackend {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for wd in state.watches.drain() {
            if let Err(err) = state.inotify.watches().remove(wd.clone()) {
                debug!(?wd, error = %err, "cannot remove watch on teardown");
            }
        }
    }
}

/// One event per path, in first-seen order, with the flags of every change
/// to that path merged.
fn coalesce(changes: Vec<(PathBuf, Vec<EventFlag>)>, time: SystemTime) -> Vec<Event> {
    let mut merged: Vec<(PathBuf, Vec<EventFlag>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for (path, flags) in changes {
        match index.get(&path) {
            Some(&i) => merged[i].1.extend(flags),
            None => {
                index.insert(path.clone(), merged.len());
                merged.push((path, flags));
            }
        }
    }

    merged
        .into_iter()
        .map(|(path, flags)| Event::new(path, time, flags))
        .collect()
}

fn watch_mask(watch_access: bool) -> WatchMask {
    if watch_access {
        WatchMask::ALL_EVENTS
    } else {
        WatchMask::ALL_EVENTS & !WatchMask::ACCESS
    }
}

/// Flags reported on the entry a record names, in reporting order.
const NODE_FLAGS: &[(EventMask, &[EventFlag])] = &[
    (EventMask::ACCESS, &[EventFlag::PlatformSpecific]),
    (EventMask::ATTRIB, &[EventFlag::AttributeModified]),
    (EventMask::CLOSE_NOWRITE, &[EventFlag::PlatformSpecific]),
    (EventMask::CLOSE_WRITE, &[EventFlag::Updated]),
    (EventMask::CREATE, &[EventFlag::Created]),
    (EventMask::DELETE, &[EventFlag::Removed]),
    (EventMask::MODIFY, &[EventFlag::Updated]),
    (EventMask::MOVED_FROM, &[EventFlag::Removed, EventFlag::MovedFrom]),
    (EventMask::MOVED_TO, &[EventFlag::Created, EventFlag::MovedTo]),
    (EventMask::OPEN, &[EventFlag::PlatformSpecific]),
];

/// What one inotify record means for the monitor.
#[derive(Debug, Default, PartialEq)]
struct RecordActions {
    events: Vec<(PathBuf, Vec<EventFlag>)>,
    /// Newly appeared directory to scan on the next pass.
    rescan: Option<PathBuf>,
    /// The watch must be removed from the kernel.
    remove_watch: bool,
    /// The descriptor must be dropped from the watch table.
    forget_descriptor: bool,
}

/// Translate a record for the watch on `watched`.
///
/// Flags describing the watched object itself are reported on `watched`;
/// flags describing an entry are reported on `watched/name`.
fn translate(mask: EventMask, watched: &Path, name: Option<&OsStr>) -> RecordActions {
    let mut actions = RecordActions::default();

    let mut dir_flags = Vec::new();
    if mask.contains(EventMask::ISDIR) {
        dir_flags.push(EventFlag::IsDir);
    }
    if mask.contains(EventMask::MOVE_SELF) {
        dir_flags.push(EventFlag::Updated);
    }
    if mask.contains(EventMask::UNMOUNT) {
        dir_flags.push(EventFlag::PlatformSpecific);
    }
    if !dir_flags.is_empty() {
        actions.events.push((watched.to_path_buf(), dir_flags));
    }

    let path = match name {
        Some(name) if !name.is_empty() => watched.join(name),
        _ => watched.to_path_buf(),
    };

    let node_flags: Vec<EventFlag> = NODE_FLAGS
        .iter()
        .filter(|(bit, _)| mask.contains(*bit))
        .flat_map(|(_, flags)| flags.iter().copied())
        .collect();

    if mask.contains(EventMask::ISDIR)
        && (mask.contains(EventMask::CREATE) || mask.contains(EventMask::MOVED_TO))
    {
        actions.rescan = Some(path.clone());
    }

    if !node_flags.is_empty() {
        actions.events.push((path, node_flags));
    }

    if mask.contains(EventMask::IGNORED) || mask.contains(EventMask::DELETE_SELF) {
        actions.forget_descriptor = true;
    }
    if mask.contains(EventMask::MOVE_SELF) {
        actions.remove_watch = true;
        actions.forget_descriptor = true;
    }

    actions
}

/// Block until `fd` is readable or `timeout` expires.
fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    };

    // SAFETY: `set` is a properly initialised fd_set holding one descriptor
    // that stays open for the duration of the call.
    let ready = unsafe {
        let mut set: libc::fd_set = mem::zeroed();
        libc::FD_ZERO(&mut set);
        libc::FD_SET(fd, &mut set);
        libc::select(
            fd + 1,
            &mut set,
            ptr::null_mut(),
            ptr::null_mut(),
            &mut tv,
        )
    };

    match ready {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}
