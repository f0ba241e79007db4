//! End-to-end watch service test: real filesystem notifications, real
//! tempdir roots, recording storage backend.
//!
//! Exercises the shared-flush scenario: files appearing under two configured
//! roots within the same quiet period are uploaded in one batch, each to its
//! own bucket, and only the delete-flagged source is removed afterwards.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bucketferry_core::config::{Config, CredentialsConfig, GlobalConfig, PathConfig};
use bucketferry_core::domain::PutOutcome;
use bucketferry_core::ports::IObjectStorage;
use bucketferry_sync::service::WatchService;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingStorage {
    puts: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl IObjectStorage for RecordingStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        _body: Vec<u8>,
        _content_type: &str,
    ) -> anyhow::Result<PutOutcome> {
        self.puts
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(PutOutcome::default())
    }
}

#[tokio::test]
async fn creates_under_two_roots_share_one_flush() {
    let data_a = tempfile::tempdir().expect("tempdir a");
    let data_b = tempfile::tempdir().expect("tempdir b");
    // Pre-existing subdirectory under the recursive root
    let sub = data_a.path().join("sub");
    std::fs::create_dir(&sub).unwrap();

    let config = Config {
        paths: vec![
            PathConfig {
                root: data_a.path().to_path_buf(),
                bucket: "bkt-a".into(),
                recursive: true,
                delete: false,
                delay: 1,
            },
            PathConfig {
                root: data_b.path().to_path_buf(),
                bucket: "bkt-b".into(),
                recursive: false,
                delete: true,
                delay: 1,
            },
        ],
        global: GlobalConfig {
            bucket: String::new(),
            delay: 1,
        },
        credentials: CredentialsConfig::default(),
        verbose: false,
    };

    let storage = Arc::new(RecordingStorage::default());
    let shutdown = CancellationToken::new();

    let service_storage: Arc<dyn IObjectStorage> = storage.clone();
    let service_shutdown = shutdown.clone();
    let service = tokio::spawn(async move {
        WatchService::start(&config, service_storage, service_shutdown).await
    });

    // Let watch registration settle before producing events
    tokio::time::sleep(Duration::from_millis(300)).await;

    let file_a = data_a.path().join("x");
    let file_sub = sub.join("z");
    let file_b = data_b.path().join("y");
    std::fs::write(&file_a, b"from a").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&file_sub, b"from a/sub").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&file_b, b"from b").unwrap();

    // Quiet period is 1s after the last create; poll generously
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if storage.puts.lock().unwrap().len() >= 3 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for uploads: {:?}",
            storage.puts.lock().unwrap()
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let puts = storage.puts.lock().unwrap().clone();
    assert!(puts.contains(&("bkt-a".into(), "x".into())), "{puts:?}");
    assert!(puts.contains(&("bkt-a".into(), "sub/z".into())), "{puts:?}");
    assert!(puts.contains(&("bkt-b".into(), "y".into())), "{puts:?}");

    // Deletion policy: only the delete-flagged root's file disappears
    assert!(file_a.exists());
    assert!(file_sub.exists());
    assert!(!file_b.exists());

    shutdown.cancel();
    service
        .await
        .expect("service task join")
        .expect("service run");
}

#[tokio::test]
async fn start_fails_when_nothing_can_be_watched() {
    let config = Config {
        paths: vec![PathConfig {
            root: PathBuf::from("/definitely/not/a/real/dir"),
            bucket: "bkt".into(),
            recursive: false,
            delete: false,
            delay: 1,
        }],
        global: GlobalConfig {
            bucket: String::new(),
            delay: 1,
        },
        credentials: CredentialsConfig::default(),
        verbose: false,
    };

    let storage: Arc<dyn IObjectStorage> = Arc::new(RecordingStorage::default());
    let result = WatchService::start(&config, storage, CancellationToken::new()).await;
    assert!(result.is_err());
}
