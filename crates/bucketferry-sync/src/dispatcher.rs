//! Upload dispatcher - turns flushed batches into storage PUTs
//!
//! For each queued file the dispatcher resolves the owning configuration
//! through the directory ownership map, computes the destination object key,
//! reads the file, sniffs its content type and submits the upload. Outcomes
//! are independent per file: one failure is logged and the batch continues.
//!
//! Files are never retried or re-queued; a file whose parent directory has
//! no registered configuration is reported and skipped without deleting it.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketferry_core::{
    config::PathConfig,
    domain::QueuedFile,
    ports::IObjectStorage,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::sniff;

/// Consumes flush batches and drives uploads through the storage port.
pub struct Dispatcher {
    /// Storage backend performing the authenticated PUT
    storage: Arc<dyn IObjectStorage>,
    /// Directory → owning configuration, built once at start-up
    owners: Arc<HashMap<PathBuf, PathConfig>>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given storage backend and ownership map.
    pub fn new(storage: Arc<dyn IObjectStorage>, owners: Arc<HashMap<PathBuf, PathConfig>>) -> Self {
        Self { storage, owners }
    }

    /// Consumes batches until the flush channel closes.
    pub async fn run(self, mut flush_rx: mpsc::Receiver<Vec<QueuedFile>>) {
        while let Some(batch) = flush_rx.recv().await {
            self.flush(batch).await;
        }
        info!("Dispatcher stopped");
    }

    /// Processes one batch in queue order. Errors are reported per file and
    /// never aggregated into a batch-level failure.
    pub async fn flush(&self, batch: Vec<QueuedFile>) {
        info!(count = batch.len(), "Uploading flushed batch");

        for file in &batch {
            if let Err(err) = self.upload(file).await {
                error!(
                    source = %file.source.display(),
                    error = %format!("{err:#}"),
                    "Upload failed, skipping file"
                );
            }
        }
    }

    /// Uploads one file and applies the post-upload deletion policy.
    async fn upload(&self, file: &QueuedFile) -> Result<()> {
        // Ownership is resolved at flush time, not enqueue time
        let Some(config) = file.source.parent().and_then(|dir| self.owners.get(dir)) else {
            warn!(
                source = %file.source.display(),
                "No configuration registered for parent directory, skipping upload"
            );
            return Ok(());
        };

        let key = object_key(&file.source, &config.root).with_context(|| {
            format!(
                "file {} is not under configured root {}",
                file.source.display(),
                config.root.display()
            )
        })?;

        let body = tokio::fs::read(&file.source)
            .await
            .with_context(|| format!("failed to read {}", file.source.display()))?;
        let content_type = sniff::detect_content_type(&body);

        info!(
            source = %file.source.display(),
            bucket = %config.bucket,
            key = %key,
            size = body.len(),
            content_type = %content_type,
            "Uploading file"
        );

        let outcome = self
            .storage
            .put_object(&config.bucket, &key, body, content_type.as_ref())
            .await
            .with_context(|| format!("upload to {}/{} failed", config.bucket, key))?;

        debug!(etag = ?outcome.etag, version_id = ?outcome.version_id, "Upload response");

        if config.delete {
            // Deletion only after the upload is confirmed; a delete failure
            // is reported on its own and never undoes the upload.
            match tokio::fs::remove_file(&file.source).await {
                Ok(()) => info!(
                    source = %file.source.display(),
                    "Deleted source after upload (delete is set on its path)"
                ),
                Err(err) => warn!(
                    source = %file.source.display(),
                    error = %err,
                    "Uploaded but failed to delete source"
                ),
            }
        }

        Ok(())
    }
}

/// Computes the destination object key for a source file.
///
/// The key is the path relative to the configured root, with the leading
/// separator stripped and components joined by forward slashes regardless of
/// the host separator. Returns `None` when the source is not under the root
/// or resolves to an empty key.
pub fn object_key(source: &Path, root: &Path) -> Option<String> {
    let relative = source.strip_prefix(root).ok()?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
