//! Watch service - wires registry, watcher, debouncer and dispatcher
//!
//! [`WatchService::start`] performs the start-up sequence (registry build,
//! watcher creation, per-directory registration) and then blocks in the
//! debounce loop until the process is shut down. Only start-up errors
//! propagate; steady-state per-file errors are contained downstream.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketferry_core::{config::Config, ports::IObjectStorage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::debouncer::Debouncer;
use crate::dispatcher::Dispatcher;
use crate::registry;
use crate::watcher::FileWatcher;

/// Capacity of the channel carrying flush batches to the dispatcher.
const FLUSH_CHANNEL_CAPACITY: usize = 16;

/// The long-running watch-and-upload service.
pub struct WatchService;

impl WatchService {
    /// Builds the watch set, registers every directory, and runs the
    /// debounce loop until `shutdown` fires or the watcher goes away.
    ///
    /// Blocks the calling context for the lifetime of the run.
    ///
    /// # Errors
    /// Start-up fatal conditions only: the notification source cannot be
    /// created, or not a single configured directory could be watched.
    pub async fn start(
        config: &Config,
        storage: Arc<dyn IObjectStorage>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        // Built once; read-only for the rest of the run.
        let watch_set = registry::build_watch_set(&config.paths);

        let (mut watcher, event_rx) =
            FileWatcher::new().context("failed to start the filesystem notification source")?;

        let mut watching = 0usize;
        for dir in &watch_set.dirs {
            match watcher.watch_dir(dir) {
                Ok(()) => {
                    info!(path = %dir.display(), "Watching directory");
                    watching += 1;
                }
                Err(err) => {
                    warn!(
                        path = %dir.display(),
                        error = %format!("{err:#}"),
                        "Failed to watch directory, skipping it"
                    );
                }
            }
        }
        anyhow::ensure!(watching > 0, "no configured directory could be watched");
        info!(directories = watching, "Watch registration complete");

        let (flush_tx, flush_rx) = mpsc::channel(FLUSH_CHANNEL_CAPACITY);

        let dispatcher = Dispatcher::new(storage, Arc::new(watch_set.owners));
        let dispatcher_task = tokio::spawn(dispatcher.run(flush_rx));

        let roots: HashSet<PathBuf> = config.paths.iter().map(|p| p.root.clone()).collect();
        let debouncer = Debouncer::new(
            event_rx,
            flush_tx,
            config.global.delay(),
            roots,
            shutdown,
        );

        // The debouncer owns the flush sender; when its loop ends the
        // dispatcher drains remaining batches and stops.
        debouncer.run().await;
        drop(watcher);

        if let Err(err) = dispatcher_task.await {
            error!(error = %err, "Dispatcher task failed");
        }

        Ok(())
    }
}
