// src/monitor/scan.rs

//! Recursive tree walk shared by the backends.

use std::path::Path;

use tracing::{debug, trace};

use crate::fs::{FileSystem, NodeStat};
use crate::monitor::core::MonitorCore;

/// Walks a watched root honouring the monitor's symlink, directory-only,
/// path-filter and recursion settings.
pub struct TreeWalker<'a> {
    pub fs: &'a dyn FileSystem,
    pub core: &'a MonitorCore,
    /// Whether children that are not directories are handed to the visitor.
    /// The inotify backend covers files through their parent's watch and
    /// leaves this off.
    pub visit_child_files: bool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(fs: &'a dyn FileSystem, core: &'a MonitorCore, visit_child_files: bool) -> Self {
        Self {
            fs,
            core,
            visit_child_files,
        }
    }

    /// Walk `path`, calling `visit` for every accepted node.
    ///
    /// Returning `false` from `visit` stops the descent below that node; the
    /// backends use it to skip nodes they already know, which also breaks
    /// symlink loops.
    pub fn walk(
        &self,
        path: &Path,
        accept_non_dirs: bool,
        visit: &mut dyn FnMut(&Path, &NodeStat) -> bool,
    ) {
        let stat = match self.fs.lstat(path) {
            Ok(stat) => stat,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot stat path");
                return;
            }
        };

        let config = self.core.config();

        if config.follow_symlinks && stat.is_symlink() {
            match self.fs.canonicalize(path) {
                Ok(target) => self.walk(&target, accept_non_dirs, visit),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "cannot resolve symlink");
                }
            }
            return;
        }

        if !stat.is_dir() && (!accept_non_dirs || config.directory_only) {
            return;
        }

        if !self.core.accept_path(path) {
            trace!(path = %path.display(), "path rejected by filters");
            return;
        }

        if !visit(path, &stat) {
            return;
        }

        if !config.recursive || !stat.is_dir() {
            return;
        }

        let children = match self.fs.read_dir(path) {
            Ok(children) => children,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot read directory");
                return;
            }
        };

        for child in children {
            self.walk(&child, self.visit_child_files, visit);
        }
    }
}
