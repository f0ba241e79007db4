//! Domain types shared across the workspace.
//!
//! Filesystem change events are represented as a tagged variant rather than
//! bit-flag checks so the debounce logic's case analysis stays exhaustive.

use std::path::PathBuf;

/// A filesystem change event as seen by the watch engine.
///
/// This is the internal representation, decoupled from the notification
/// backend's raw event types. The engine reacts to `Created` (enqueue and
/// re-arm the flush timer) and `Removed` (conservative per-source shutdown
/// when the path is a watched root); everything else is `Other` and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    /// A new file or directory appeared at the given path.
    Created(PathBuf),
    /// A file or directory was removed from the given path.
    Removed(PathBuf),
    /// Any other change (modify, rename, metadata). Never acted on.
    Other(PathBuf),
}

/// One file observed as newly created, waiting for the next flush.
///
/// Only the source path is captured at enqueue time. The destination object
/// key and the owning path configuration are resolved lazily at flush time
/// so the most current directory ownership map is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    /// Absolute path of the file on disk.
    pub source: PathBuf,
}

impl QueuedFile {
    /// Creates a queued file for the given source path.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Result of a successful object PUT, as reported by the storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOutcome {
    /// Entity tag of the stored object, when the backend returns one.
    pub etag: Option<String>,
    /// Version identifier for versioned buckets.
    pub version_id: Option<String>,
}
