use fusebox_storage::{MemoryStorage, SharedStorage, Storage};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Clones share one store.
#[tokio::test]
async fn clones_share_entries() {
    let a = MemoryStorage::new();
    let b = a.clone();

    a.set("k", "v", None).await.unwrap();
    assert_eq!(b.get("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(b.increment("n").await.unwrap(), 1);
    assert_eq!(a.increment("n").await.unwrap(), 2);
}

/// Entries written with a TTL vanish once it passes.
#[tokio::test(start_paused = true)]
async fn ttl_expires_entries() {
    let storage = MemoryStorage::new();
    storage
        .set("k", "v", Some(Duration::from_secs(10)))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(9)).await;
    assert!(storage.get("k").await.unwrap().is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(storage.get("k").await.unwrap().is_none());
}

/// Incrementing an expired counter starts over from one.
#[tokio::test(start_paused = true)]
async fn increment_after_expiry_restarts() {
    let storage = MemoryStorage::new();
    storage.increment("n").await.unwrap();
    storage.increment("n").await.unwrap();
    assert!(storage.expire("n", Duration::from_secs(5)).await.unwrap());

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(storage.increment("n").await.unwrap(), 1);
}

/// Expiring a missing key reports that nothing was changed.
#[tokio::test]
async fn expire_missing_key() {
    let storage = MemoryStorage::new();
    assert!(!storage.expire("absent", Duration::from_secs(5)).await.unwrap());
}

/// The backend is usable behind a trait object from many tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_trait_object_counts_atomically() {
    let storage: SharedStorage = Arc::new(MemoryStorage::new());

    let tasks = (0..10).map(|_| {
        let storage = Arc::clone(&storage);
        tokio::spawn(async move {
            for _ in 0..100 {
                storage.increment("hits").await.unwrap();
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(storage.get("hits").await.unwrap().as_deref(), Some("1000"));
}

/// Purging drops expired entries without touching live ones.
#[tokio::test(start_paused = true)]
async fn purge_expired_counts_removed() {
    let storage = MemoryStorage::new();
    storage
        .set("short", "1", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    storage.set("forever", "2", None).await.unwrap();

    tokio::time::advance(Duration::from_secs(2)).await;

    assert_eq!(storage.purge_expired().unwrap(), 1);
    assert_eq!(storage.len(), 1);
}
