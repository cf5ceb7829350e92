//! Integration tests for MemoryCoordinationStore
//!
//! These tests exercise the ICoordinationStore contract the sync use cases
//! rely on, plus snapshot persistence through the filesystem.

use std::sync::Arc;
use std::time::Duration;

use zkmirror_core::domain::{Acl, CreateMode, NodePath, RemoteOperation, StatusCode};
use zkmirror_core::ports::ICoordinationStore;
use zkmirror_store::{MemoryCoordinationStore, StoreError};

// ============================================================================
// Test helpers
// ============================================================================

fn node(path: &str) -> NodePath {
    NodePath::new(path.to_string()).unwrap()
}

async fn create(store: &MemoryCoordinationStore, path: &str, data: &[u8]) {
    store
        .create(&node(path), data, Acl::Open, CreateMode::Persistent)
        .await
        .unwrap();
}

// ============================================================================
// Protocol tests
// ============================================================================

#[tokio::test]
async fn test_exists_reports_no_node_for_absent_path() {
    let store = MemoryCoordinationStore::new();
    assert_eq!(store.exists(&node("/missing")).await, Err(StatusCode::NoNode));
}

#[tokio::test]
async fn test_create_then_exists() {
    let store = MemoryCoordinationStore::new();
    create(&store, "/app", b"hello").await;

    let stat = store.exists(&node("/app")).await.unwrap();
    assert_eq!(stat.version, 0);
    assert_eq!(stat.data_length, 5);
    assert_eq!(store.get_data(&node("/app")), Some(b"hello".to_vec()));
}

#[tokio::test]
async fn test_create_requires_parent() {
    let store = MemoryCoordinationStore::new();
    let result = store
        .create(&node("/a/b"), b"", Acl::Open, CreateMode::Persistent)
        .await;
    assert_eq!(result, Err(StatusCode::NoNode));
    assert_eq!(store.node_count(), 1);
}

#[tokio::test]
async fn test_create_rejects_existing_node() {
    let store = MemoryCoordinationStore::new();
    create(&store, "/app", b"1").await;
    let result = store
        .create(&node("/app"), b"2", Acl::Open, CreateMode::Persistent)
        .await;
    assert_eq!(result, Err(StatusCode::NodeExists));
    assert_eq!(store.get_data(&node("/app")), Some(b"1".to_vec()));
}

#[tokio::test]
async fn test_set_data_checks_and_increments_version() {
    let store = MemoryCoordinationStore::new();
    create(&store, "/app", b"1").await;

    let stat = store.set_data(&node("/app"), b"22", 0).await.unwrap();
    assert_eq!(stat.version, 1);
    assert_eq!(stat.data_length, 2);

    let stale = store.set_data(&node("/app"), b"333", 0).await;
    assert_eq!(stale, Err(StatusCode::BadVersion));
    assert_eq!(store.get_data(&node("/app")), Some(b"22".to_vec()));
}

#[tokio::test]
async fn test_set_data_on_absent_node() {
    let store = MemoryCoordinationStore::new();
    assert_eq!(
        store.set_data(&node("/nope"), b"x", 0).await,
        Err(StatusCode::NoNode)
    );
}

#[tokio::test]
async fn test_touch_makes_observed_version_stale() {
    let store = MemoryCoordinationStore::new();
    create(&store, "/app", b"1").await;
    let observed = store.exists(&node("/app")).await.unwrap();

    store.touch(&node("/app")).unwrap();

    let result = store.set_data(&node("/app"), b"2", observed.version).await;
    assert_eq!(result, Err(StatusCode::BadVersion));
}

#[tokio::test]
async fn test_faults_target_operation_and_path() {
    let store = MemoryCoordinationStore::new();
    store.fail_next(RemoteOperation::Create, node("/a"), StatusCode::NoAuth);

    assert_eq!(store.exists(&node("/a")).await, Err(StatusCode::NoNode));
    let result = store
        .create(&node("/a"), b"", Acl::Open, CreateMode::Persistent)
        .await;
    assert_eq!(result, Err(StatusCode::NoAuth));

    create(&store, "/a", b"").await;
    assert_eq!(store.stats().creates, 1);
}

#[tokio::test]
async fn test_stats_count_successful_writes() {
    let store = MemoryCoordinationStore::new();
    create(&store, "/a", b"").await;
    create(&store, "/b", b"").await;
    store.set_data(&node("/a"), b"x", 0).await.unwrap();
    let _ = store.set_data(&node("/a"), b"y", 0).await;

    let stats = store.stats();
    assert_eq!(stats.creates, 2);
    assert_eq!(stats.updates, 1);
    assert_eq!(stats.writes(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_latency() {
    let store = Arc::new(MemoryCoordinationStore::new().with_latency(Duration::from_millis(2)));
    create(&store, "/dir", b"").await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create(
                    &node(&format!("/dir/n{i}")),
                    format!("{i}").as_bytes(),
                    Acl::Open,
                    CreateMode::Persistent,
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.children(&node("/dir")).len(), 32);
    assert_eq!(store.get_data(&node("/dir/n7")), Some(b"7".to_vec()));
}

// ============================================================================
// Snapshot tests
// ============================================================================

#[tokio::test]
async fn test_snapshot_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("namespace.json");

    let store = MemoryCoordinationStore::new();
    create(&store, "/app", b"").await;
    create(&store, "/app/text", b"X").await;
    create(&store, "/app/bin", &[0xde, 0xad, 0xbe, 0xef]).await;
    store.set_data(&node("/app/text"), b"Y", 0).await.unwrap();
    store.save(&path).unwrap();

    let loaded = MemoryCoordinationStore::load(&path).unwrap();
    assert_eq!(loaded.paths(), store.paths());
    assert_eq!(loaded.get_data(&node("/app/text")), Some(b"Y".to_vec()));
    assert_eq!(loaded.stat(&node("/app/text")).unwrap().version, 1);
    assert_eq!(
        loaded.get_data(&node("/app/bin")),
        Some(vec![0xde, 0xad, 0xbe, 0xef])
    );
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_load_or_empty_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryCoordinationStore::load_or_empty(&dir.path().join("none.json")).unwrap();
    assert_eq!(store.paths(), vec![NodePath::root()]);
}

#[test]
fn test_load_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("namespace.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        MemoryCoordinationStore::load_or_empty(&path),
        Err(StoreError::Serialization(_))
    ));
}

#[test]
fn test_load_rejects_invalid_node_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("namespace.json");
    std::fs::write(
        &path,
        r#"{"format":1,"nodes":[{"path":"relative","version":0,"data":""}]}"#,
    )
    .unwrap();

    assert!(MemoryCoordinationStore::load(&path).is_err());
}
