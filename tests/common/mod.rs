#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use file_monitor::Monitor;
use file_monitor::factory;
use file_monitor::types::MonitorType;
use file_monitor_test_utils::EventRecorder;
use tempfile::TempDir;

/// Long enough for a poll cycle (at least one second) plus scheduling noise.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(8);

/// A temporary directory with its canonical path, so event paths compare
/// equal even when the temp root sits behind a symlink.
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = fs::canonicalize(dir.path()).expect("canonicalize temp dir");
        Self { _dir: dir, root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }
}

/// Build a recursive monitor of `monitor_type` on `root`, with a short latency.
pub fn recursive_monitor(
    monitor_type: MonitorType,
    root: &Path,
    recorder: &EventRecorder,
) -> Monitor {
    let mut monitor = factory::create_monitor(
        monitor_type,
        vec![root.to_path_buf()],
        Some(recorder.callback()),
        None,
    )
    .expect("create monitor");
    monitor.set_recursive(true);
    monitor.set_latency(0.1).expect("valid latency");
    monitor
}
