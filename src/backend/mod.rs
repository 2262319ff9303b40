// src/backend/mod.rs

//! Concrete change-detection strategies.
//!
//! - [`inotify`]: kernel notifications, Linux only.
//! - [`poll`]: periodic stat walks, available everywhere.

#[cfg(target_os = "linux")]
pub mod inotify;
pub mod poll;
pub mod watch_table;

#[cfg(target_os = "linux")]
pub use self::inotify::{InotifyBackend, INOTIFY_MONITOR_NAME};
pub use self::poll::{PollBackend, PollState, Snapshot, WatchedFileInfo, MIN_POLL_LATENCY, POLL_MONITOR_NAME};
pub use self::watch_table::WatchTable;
