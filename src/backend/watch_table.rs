// src/backend/watch_table.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Two-way map between watch descriptors and the paths they watch.
///
/// Both directions are updated together, so a descriptor is known by path
/// exactly when its path is known by descriptor.
#[derive(Debug)]
pub struct WatchTable<D> {
    by_descriptor: HashMap<D, PathBuf>,
    by_path: HashMap<PathBuf, D>,
}

impl<D> Default for WatchTable<D> {
    fn default() -> Self {
        Self {
            by_descriptor: HashMap::new(),
            by_path: HashMap::new(),
        }
    }
}

impl<D: Clone + Eq + Hash> WatchTable<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor` as watching `path`.
    ///
    /// The kernel hands back the existing descriptor when a path is watched
    /// twice, and may reuse a descriptor number for a different path once
    /// the old watch is gone; any stale pairing is dropped first.
    pub fn insert(&mut self, descriptor: D, path: PathBuf) {
        self.remove_descriptor(&descriptor);
        self.remove_path(&path);
        self.by_path.insert(path.clone(), descriptor.clone());
        self.by_descriptor.insert(descriptor, path);
    }

    pub fn remove_descriptor(&mut self, descriptor: &D) -> Option<PathBuf> {
        let path = self.by_descriptor.remove(descriptor)?;
        self.by_path.remove(&path);
        Some(path)
    }

    pub fn remove_path(&mut self, path: &Path) -> Option<D> {
        let descriptor = self.by_path.remove(path)?;
        self.by_descriptor.remove(&descriptor);
        Some(descriptor)
    }

    pub fn path(&self, descriptor: &D) -> Option<&Path> {
        self.by_descriptor.get(descriptor).map(PathBuf::as_path)
    }

    pub fn descriptor(&self, path: &Path) -> Option<&D> {
        self.by_path.get(path)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.by_descriptor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_descriptor.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &D> {
        self.by_descriptor.keys()
    }

    /// Empty the table, returning every descriptor that was in it.
    pub fn drain(&mut self) -> Vec<D> {
        self.by_path.clear();
        self.by_descriptor.drain().map(|(d, _)| d).collect()
    }
}
