// src/fs/mock.rs

use super::{FileSystem, NodeKind, NodeStat};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Clone)]
struct MockNode {
    entry: MockEntry,
    mtime: SystemTime,
    ctime: SystemTime,
}

/// In-memory tree with controllable timestamps.
///
/// Every mutation advances an internal clock by one second, so a touched node
/// always reports a strictly newer mtime/ctime than before.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    nodes: BTreeMap<PathBuf, MockNode>,
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn insert(&mut self, path: &Path, entry: MockEntry) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.nodes.contains_key(parent) {
                self.insert(parent, MockEntry::Dir);
            }
        }
        let now = self.tick();
        self.nodes.insert(
            path.to_path_buf(),
            MockNode {
                entry,
                mtime: now,
                ctime: now,
            },
        );
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.state().insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.state().insert(path.as_ref(), MockEntry::Dir);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.state()
            .insert(path.as_ref(), MockEntry::Symlink(target.into()));
    }

    /// Bump the modification (and change) time, as a content write would.
    pub fn write(&self, path: impl AsRef<Path>) {
        let mut state = self.state();
        let now = state.tick();
        if let Some(node) = state.nodes.get_mut(path.as_ref()) {
            node.mtime = now;
            node.ctime = now;
        }
    }

    /// Bump only the change time, as `chmod` would.
    pub fn chmod(&self, path: impl AsRef<Path>) {
        let mut state = self.state();
        let now = state.tick();
        if let Some(node) = state.nodes.get_mut(path.as_ref()) {
            node.ctime = now;
        }
    }

    /// Remove a node and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.state()
            .nodes
            .retain(|p, _| !p.starts_with(path));
    }
}

impl FileSystem for MockFileSystem {
    fn lstat(&self, path: &Path) -> Result<NodeStat> {
        let state = self.state();
        let node = state
            .nodes
            .get(path)
            .ok_or_else(|| anyhow!("No such file or directory: {:?}", path))?;

        let kind = match node.entry {
            MockEntry::File => NodeKind::File,
            MockEntry::Dir => NodeKind::Dir,
            MockEntry::Symlink(_) => NodeKind::Symlink,
        };

        Ok(NodeStat {
            kind,
            mtime: node.mtime,
            ctime: node.ctime,
        })
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let state = self.state();
        let mut current = path.to_path_buf();

        // Bounded to catch symlink cycles.
        for _ in 0..32 {
            match state.nodes.get(&current).map(|n| &n.entry) {
                Some(MockEntry::Symlink(target)) => current = target.clone(),
                Some(_) => return Ok(current),
                None => return Err(anyhow!("No such file or directory: {:?}", current)),
            }
        }

        Err(anyhow!("Too many levels of symbolic links: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state();
        match state.nodes.get(path).map(|n| &n.entry) {
            Some(MockEntry::Dir) => Ok(state
                .nodes
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
