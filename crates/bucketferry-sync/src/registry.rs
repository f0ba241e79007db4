//! Path registry - expands configured roots into the watch set
//!
//! Each configured root is registered under its own [`PathConfig`]; when the
//! configuration asks for recursion, every directory in the subtree is
//! registered under the same configuration. The resulting reverse map is
//! what lets the dispatcher resolve a file back to its bucket and deletion
//! policy at flush time.
//!
//! The expansion runs once at start-up. Directories created afterwards are
//! never retroactively added to the watch set; that is a documented
//! limitation, not a bug.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bucketferry_core::config::PathConfig;
use tracing::{debug, warn};

/// The full set of directories to watch plus the ownership map.
#[derive(Debug, Default)]
pub struct WatchSet {
    /// Every directory to register with the notification source, in
    /// first-seen order without duplicates.
    pub dirs: Vec<PathBuf>,
    /// Reverse lookup from directory to the configuration that owns it.
    /// Read-only once the watch phase begins.
    pub owners: HashMap<PathBuf, PathConfig>,
}

impl WatchSet {
    fn register(&mut self, dir: PathBuf, config: &PathConfig) {
        // Overlapping roots: the later configuration wins for the
        // overlapping directory, but the directory is only listed once.
        if self.owners.insert(dir.clone(), config.clone()).is_none() {
            self.dirs.push(dir);
        }
    }
}

/// Builds the watch set from the configured paths, in configuration order.
///
/// Directories that cannot be walked are logged as warnings and skipped;
/// the offending subtree's registration is simply incomplete. The build
/// itself never fails.
pub fn build_watch_set(paths: &[PathConfig]) -> WatchSet {
    let mut set = WatchSet::default();

    for config in paths {
        debug!(root = %config.root.display(), recursive = config.recursive, "Registering watch root");
        set.register(config.root.clone(), config);

        if config.recursive {
            walk_dirs(&config.root, &mut |dir| {
                debug!(path = %dir.display(), "Registering subdirectory");
                set.register(dir, config);
            });
        }
    }

    set
}

/// Visits every directory strictly below `dir`, depth-first.
///
/// I/O errors are reported per failing directory and do not abort the walk.
/// Symlinked directories are not followed.
fn walk_dirs(dir: &Path, visit: &mut impl FnMut(PathBuf)) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                path = %dir.display(),
                error = %err,
                "Cannot walk directory, its subtree will not be watched"
            );
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            let path = entry.path();
            visit(path.clone());
            walk_dirs(&path, visit);
        }
    }
}
