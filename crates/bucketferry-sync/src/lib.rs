//! bucketferry watch engine
//!
//! Watches configured directories for newly created files, coalesces bursts
//! of create events behind a single resettable quiet-period timer, and
//! uploads each settled file to its configured bucket.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │
//!       ▼
//!  FileWatcher ──→ mpsc::channel ──→ Debouncer ──→ batch channel ──→ Dispatcher ──→ IObjectStorage
//!                                        │
//!                                 resettable timer
//! ```
//!
//! - [`registry`] - expands configured roots into the watch set and the
//!   directory → configuration ownership map
//! - [`watcher`] - adapter over the `notify` crate
//! - [`debouncer`] - the single control loop owning the queue and the timer
//! - [`dispatcher`] - resolves, sniffs and uploads flushed batches
//! - [`sniff`] - content-type detection over leading bytes
//! - [`service`] - wires everything together behind one `start()` call

pub mod debouncer;
pub mod dispatcher;
pub mod registry;
pub mod service;
pub mod sniff;
pub mod watcher;
