//! Filesystem notification adapter
//!
//! Wraps the `notify` crate and converts raw OS events into [`FsEvent`]
//! values delivered over an mpsc channel. Directories are registered
//! one-by-one, non-recursively: the [registry](crate::registry) already
//! expanded recursive roots into individual directories, which is what keeps
//! per-directory ownership lookups exact at flush time.

use std::path::Path;

use anyhow::{Context, Result};
use bucketferry_core::domain::FsEvent;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches directories using the OS-native mechanism (inotify on Linux).
///
/// Raw events are mapped to [`FsEvent`] in the notification callback and
/// forwarded through the channel returned by [`FileWatcher::new`]. Dropping
/// the watcher closes the channel, which the debounce loop treats as a
/// shutdown signal.
pub struct FileWatcher {
    /// The underlying notify watcher instance
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a watcher and the receiving end of its event channel.
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created;
    /// this is a start-up fatal condition for the watch service.
    pub fn new() -> Result<(Self, mpsc::Receiver<FsEvent>)> {
        let (event_tx, event_rx) = mpsc::channel::<FsEvent>(1024);

        info!("Initializing filesystem watcher");

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(mapped) = map_notify_event(&event) {
                        if let Err(e) = event_tx.blocking_send(mapped) {
                            warn!(error = %e, "Failed to forward event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "Filesystem watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        Ok((Self { watcher }, event_rx))
    }

    /// Registers a single directory, non-recursively.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be watched (does not exist,
    /// insufficient permissions, or the inotify watch limit was reached).
    /// The caller treats this as a per-directory warning, not a fatal error.
    pub fn watch_dir(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", path.display()))?;

        Ok(())
    }
}

/// Converts a `notify::Event` into the engine's [`FsEvent`].
///
/// - `Create(File | Any | ..)` -> `FsEvent::Created`
/// - `Create(Folder)` -> `FsEvent::Other` (new directories are not uploads,
///   and the watch set is fixed at start-up anyway)
/// - `Remove(*)` -> `FsEvent::Removed`
/// - `Modify(*)` (data, metadata, renames) -> `FsEvent::Other`
/// - Access events and events without paths -> `None`
fn map_notify_event(event: &notify::Event) -> Option<FsEvent> {
    let path = event.paths.first()?;

    match &event.kind {
        EventKind::Create(notify::event::CreateKind::Folder) => {
            debug!(path = %path.display(), "Ignoring directory creation");
            Some(FsEvent::Other(path.clone()))
        }
        EventKind::Create(_) => {
            debug!(path = %path.display(), "Mapped Create event");
            Some(FsEvent::Created(path.clone()))
        }
        EventKind::Remove(_) => {
            debug!(path = %path.display(), "Mapped Remove event");
            Some(FsEvent::Removed(path.clone()))
        }
        EventKind::Modify(_) => {
            debug!(path = %path.display(), kind = ?event.kind, "Mapped Modify event");
            Some(FsEvent::Other(path.clone()))
        }
        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{DataChange, MetadataKind, ModifyKind, RenameMode};

    use super::*;

    #[test]
    fn maps_create_event() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/a.txt")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(FsEvent::Created(PathBuf::from("/a.txt")))
        );
    }

    #[test]
    fn directory_creation_maps_to_other() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::Folder),
            paths: vec![PathBuf::from("/data/a/newdir")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(FsEvent::Other(PathBuf::from("/data/a/newdir")))
        );
    }

    #[test]
    fn maps_remove_event() {
        let event = notify::Event {
            kind: EventKind::Remove(notify::event::RemoveKind::Folder),
            paths: vec![PathBuf::from("/data/a")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(FsEvent::Removed(PathBuf::from("/data/a")))
        );
    }

    #[test]
    fn maps_modify_kinds_to_other() {
        for kind in [
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
        ] {
            let event = notify::Event {
                kind,
                paths: vec![PathBuf::from("/a.txt")],
                attrs: Default::default(),
            };
            assert_eq!(
                map_notify_event(&event),
                Some(FsEvent::Other(PathBuf::from("/a.txt")))
            );
        }
    }

    #[test]
    fn ignores_access_events() {
        let event = notify::Event {
            kind: EventKind::Access(notify::event::AccessKind::Read),
            paths: vec![PathBuf::from("/a.txt")],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }

    #[test]
    fn ignores_events_without_paths() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }
}
