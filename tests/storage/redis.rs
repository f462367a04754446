use fusebox_storage::{RedisStorage, Storage, StorageError};
use fusebox_tests::FakeRedis;
use std::time::Duration;

/// Basic operations round-trip through the server.
#[tokio::test]
async fn operations_reach_the_server() {
    let server = FakeRedis::start().await.unwrap();
    let storage = RedisStorage::from_settings(server.settings());

    assert_eq!(storage.get("k").await.unwrap(), None);
    assert!(storage.set("k", "v", None).await.unwrap());
    assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(storage.increment("n").await.unwrap(), 1);
    assert_eq!(storage.increment("n").await.unwrap(), 2);
    assert!(storage.expire("n", Duration::from_secs(30)).await.unwrap());
    assert!(!storage.expire("absent", Duration::from_secs(30)).await.unwrap());

    assert_eq!(server.store().get("n").await.unwrap().as_deref(), Some("2"));
}

/// A TTL on set is honoured by the server.
#[tokio::test]
async fn set_with_ttl_expires() {
    let server = FakeRedis::start().await.unwrap();
    let storage = RedisStorage::from_settings(server.settings());

    storage
        .set("k", "v", Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(storage.get("k").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(storage.get("k").await.unwrap().is_none());
    assert_eq!(
        server.commands()[0],
        vec!["SET".to_owned(), "k".into(), "v".into(), "PX".into(), "50".into()]
    );
}

/// A zero TTL means no expiry.
#[tokio::test]
async fn zero_ttl_is_plain_set() {
    let server = FakeRedis::start().await.unwrap();
    let storage = RedisStorage::from_settings(server.settings());

    storage.set("k", "v", Some(Duration::ZERO)).await.unwrap();

    assert_eq!(
        server.commands(),
        vec![vec!["SET".to_owned(), "k".into(), "v".into()]]
    );
}

/// Server-side errors are reported and the connection stays usable.
#[tokio::test]
async fn server_error_reply() {
    let server = FakeRedis::start().await.unwrap();
    let storage = RedisStorage::from_settings(server.settings());

    storage.set("word", "abc", None).await.unwrap();
    let err = storage.increment("word").await.unwrap_err();
    assert!(matches!(err, StorageError::Backend(ref msg) if msg.contains("not an integer")));

    assert_eq!(storage.get("word").await.unwrap().as_deref(), Some("abc"));
}

/// Values with spaces, colons and non-ASCII survive the trip.
#[tokio::test]
async fn binary_safe_values() {
    let server = FakeRedis::start().await.unwrap();
    let storage = RedisStorage::from_settings(server.settings());

    let value = "half-open: ünïcode\r\nwith newline";
    storage.set("circuit:svc:state", value, None).await.unwrap();
    assert_eq!(
        storage.get("circuit:svc:state").await.unwrap().as_deref(),
        Some(value)
    );
}

/// Concurrent callers on one client are serialized over its connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_on_one_client() {
    let server = FakeRedis::start().await.unwrap();
    let storage = std::sync::Arc::new(RedisStorage::from_settings(server.settings()));

    let tasks = (0..8).map(|_| {
        let storage = std::sync::Arc::clone(&storage);
        tokio::spawn(async move {
            for _ in 0..20 {
                storage.increment("n").await.unwrap();
            }
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(storage.get("n").await.unwrap().as_deref(), Some("160"));
}

/// A zero TTL on expire removes the key, the same as the in-process backend.
#[tokio::test]
async fn expire_zero_removes_key_on_every_backend() {
    let server = FakeRedis::start().await.unwrap();
    let redis = RedisStorage::from_settings(server.settings());
    let memory = fusebox_storage::MemoryStorage::new();
    let backends: [&dyn Storage; 2] = [&redis, &memory];

    for storage in backends {
        storage.set("k", "v", None).await.unwrap();
        assert!(storage.expire("k", Duration::ZERO).await.unwrap());
        assert_eq!(storage.get("k").await.unwrap(), None);
    }
    assert!(server
        .commands()
        .contains(&vec!["PEXPIRE".to_owned(), "k".into(), "0".into()]));
}
