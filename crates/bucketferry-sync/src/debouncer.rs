//! Event debouncer - the single control loop owning the queue and the timer
//!
//! Consumes [`FsEvent`] values one at a time and maintains an in-memory
//! queue of files plus at most one pending flush timer. Every qualifying
//! create event re-arms the timer, so a flush only happens once no new
//! creations have been observed for a full quiet period.
//!
//! One shared timer serves all watched paths deliberately: the latest create
//! event anywhere in the watched tree extends the quiet period for the
//! entire pending batch.
//!
//! Flushed batches are handed to the dispatcher over a channel, so event
//! intake is never blocked by upload work and an in-flight batch can never
//! be mutated by later events.

use std::collections::HashSet;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use bucketferry_core::domain::{FsEvent, QueuedFile};
use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The debounce control loop.
///
/// Owns the queue and the timer exclusively; all producers (the watcher, the
/// shutdown signal) communicate via message passing, never by direct
/// mutation, so no locking is needed.
pub struct Debouncer {
    /// Inbound filesystem events from the watcher adapter
    event_rx: mpsc::Receiver<FsEvent>,
    /// Outbound flush batches, consumed by the dispatcher task
    flush_tx: mpsc::Sender<Vec<QueuedFile>>,
    /// The shared quiet period (global delay)
    delay: Duration,
    /// Configured watch roots, used to recognize root-removal events
    roots: HashSet<PathBuf>,
    /// Roots whose removal has been observed; events under them are ignored
    dead_roots: HashSet<PathBuf>,
    /// Files waiting for the next flush
    queue: Vec<QueuedFile>,
    /// Graceful shutdown signal
    shutdown: CancellationToken,
}

impl Debouncer {
    /// Creates a debouncer.
    ///
    /// # Arguments
    /// * `event_rx` - channel of filesystem events from the watcher
    /// * `flush_tx` - channel the dispatcher consumes flush batches from
    /// * `delay` - the shared quiet period
    /// * `roots` - the configured watch roots
    /// * `shutdown` - cancellation token for graceful shutdown
    pub fn new(
        event_rx: mpsc::Receiver<FsEvent>,
        flush_tx: mpsc::Sender<Vec<QueuedFile>>,
        delay: Duration,
        roots: HashSet<PathBuf>,
        shutdown: CancellationToken,
    ) -> Self {
        info!(delay_ms = delay.as_millis() as u64, "Creating debouncer");

        Self {
            event_rx,
            flush_tx,
            delay,
            roots,
            dead_roots: HashSet::new(),
            queue: Vec::new(),
            shutdown,
        }
    }

    /// Runs the control loop until the event channel closes or shutdown is
    /// signalled. Either way, whatever is queued at that point is flushed
    /// before returning.
    pub async fn run(mut self) {
        info!("Debouncer starting");

        // At most one outstanding timer; re-armed on every qualifying event.
        let mut flush_timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                maybe_event = self.event_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if self.handle_event(event) {
                                // Discard the old timer and start a fresh
                                // quiet period for the whole batch.
                                flush_timer = Some(Box::pin(sleep(self.delay)));
                            }
                        }
                        None => {
                            info!("Event channel closed, flushing and shutting down");
                            self.flush().await;
                            break;
                        }
                    }
                }

                () = wait_for(&mut flush_timer) => {
                    flush_timer = None;
                    self.flush().await;
                }

                () = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, flushing pending queue");
                    self.flush().await;
                    break;
                }
            }
        }

        info!("Debouncer stopped");
    }

    /// Applies the event filtering policy. Returns true when the shared
    /// timer must be re-armed.
    fn handle_event(&mut self, event: FsEvent) -> bool {
        match event {
            FsEvent::Created(path) => {
                if self.is_under_dead_root(&path) {
                    debug!(path = %path.display(), "Ignoring create under removed root");
                    return false;
                }
                info!(path = %path.display(), "Found new file");
                self.queue.push(QueuedFile::new(path));
                true
            }
            FsEvent::Removed(path) => {
                // A removed watch root is a conservative per-source shutdown
                // signal, not a per-file delete. Other roots keep flowing.
                if self.roots.contains(&path) {
                    warn!(
                        root = %path.display(),
                        "Watched root removed, halting event intake from it"
                    );
                    self.dead_roots.insert(path);
                }
                false
            }
            FsEvent::Other(path) => {
                debug!(path = %path.display(), "Ignoring non-create event");
                false
            }
        }
    }

    fn is_under_dead_root(&self, path: &std::path::Path) -> bool {
        path.ancestors().any(|dir| self.dead_roots.contains(dir))
    }

    /// Hands the entire queue to the dispatcher and resets it to empty.
    /// The snapshot is immutable once sent; new events start a fresh batch.
    async fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.queue);
        info!(count = batch.len(), "Quiet period elapsed, flushing queue");

        if self.flush_tx.send(batch).await.is_err() {
            warn!("Dispatcher is gone, dropping flush batch");
        }
    }
}

/// Resolves when the pending timer fires; pends forever while no timer is
/// armed so the select loop just waits on the other branches.
async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    fn spawn_debouncer(
        roots: Vec<PathBuf>,
    ) -> (
        mpsc::Sender<FsEvent>,
        mpsc::Receiver<Vec<QueuedFile>>,
        CancellationToken,
    ) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (flush_tx, flush_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let debouncer = Debouncer::new(
            event_rx,
            flush_tx,
            DELAY,
            roots.into_iter().collect(),
            shutdown.clone(),
        );
        tokio::spawn(debouncer.run());

        (event_tx, flush_rx, shutdown)
    }

    #[tokio::test]
    async fn burst_of_creates_flushes_once_with_all_files() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        for name in ["/data/a/x", "/data/a/y", "/data/a/z"] {
            tx.send(FsEvent::Created(PathBuf::from(name))).await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush within timeout")
            .expect("channel open");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].source, PathBuf::from("/data/a/x"));
        assert_eq!(batch[2].source, PathBuf::from("/data/a/z"));

        // Exactly one flush: nothing else arrives
        assert!(timeout(DELAY * 2, flush_rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn each_create_restarts_the_quiet_period() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        // Gaps shorter than the delay, but long enough that a timer armed
        // only on the first event would fire between them.
        for name in ["/data/a/x", "/data/a/y"] {
            tx.send(FsEvent::Created(PathBuf::from(name))).await.unwrap();
            tokio::time::sleep(DELAY * 3 / 4).await;
        }

        // 300ms after the first event: a non-restarting 200ms timer would
        // already have flushed a partial batch by now.
        assert!(flush_rx.try_recv().is_err());

        let last_send = tokio::time::Instant::now();
        tx.send(FsEvent::Created(PathBuf::from("/data/a/z")))
            .await
            .unwrap();

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush after the last event settles")
            .unwrap();
        assert_eq!(batch.len(), 3);
        // The quiet period is measured from the last event, not the first
        assert!(last_send.elapsed() >= DELAY);
    }

    #[tokio::test]
    async fn gap_longer_than_delay_produces_two_flushes() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        tx.send(FsEvent::Created(PathBuf::from("/data/first")))
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("first flush")
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].source, PathBuf::from("/data/first"));

        tx.send(FsEvent::Created(PathBuf::from("/data/second")))
            .await
            .unwrap();

        let second = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("second flush")
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].source, PathBuf::from("/data/second"));
    }

    #[tokio::test]
    async fn other_events_neither_enqueue_nor_reset() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        tx.send(FsEvent::Created(PathBuf::from("/data/a/x")))
            .await
            .unwrap();
        tx.send(FsEvent::Other(PathBuf::from("/data/a/x")))
            .await
            .unwrap();
        tx.send(FsEvent::Other(PathBuf::from("/data/a/y")))
            .await
            .unwrap();

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush")
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn removed_root_halts_intake_without_crashing() {
        let root = PathBuf::from("/data/a");
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![root.clone()]);

        tx.send(FsEvent::Removed(root)).await.unwrap();
        tx.send(FsEvent::Created(PathBuf::from("/data/a/late")))
            .await
            .unwrap();

        // Nothing under the dead root gets queued
        assert!(timeout(DELAY * 2, flush_rx.recv()).await.is_err());

        // Other sources are unaffected, the loop is still alive
        tx.send(FsEvent::Created(PathBuf::from("/data/b/fresh")))
            .await
            .unwrap();
        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush from surviving root")
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].source, PathBuf::from("/data/b/fresh"));
    }

    #[tokio::test]
    async fn removed_non_root_is_ignored() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![PathBuf::from("/data/a")]);

        // Plain file removal under a root is not a shutdown signal
        tx.send(FsEvent::Removed(PathBuf::from("/data/a/gone.txt")))
            .await
            .unwrap();
        tx.send(FsEvent::Created(PathBuf::from("/data/a/new.txt")))
            .await
            .unwrap();

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush")
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn channel_close_flushes_remaining_queue() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        tx.send(FsEvent::Created(PathBuf::from("/data/a/x")))
            .await
            .unwrap();
        drop(tx);

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush on close")
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_flushes_remaining_queue() {
        let (tx, mut flush_rx, shutdown) = spawn_debouncer(vec![]);

        tx.send(FsEvent::Created(PathBuf::from("/data/a/x")))
            .await
            .unwrap();
        // Give the loop a moment to take the event, then cancel mid-window
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let batch = timeout(Duration::from_secs(2), flush_rx.recv())
            .await
            .expect("flush on shutdown")
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn empty_queue_never_flushes() {
        let (tx, mut flush_rx, _shutdown) = spawn_debouncer(vec![]);

        tx.send(FsEvent::Other(PathBuf::from("/data/a/x")))
            .await
            .unwrap();
        drop(tx);

        assert!(timeout(DELAY * 2, flush_rx.recv()).await.unwrap_or(None).is_none());
    }
}
