use fusebox_storage::{
    RedisSettings, Storage, StorageRegistry, StorageSettings, MEMORY_BACKEND, REDIS_BACKEND,
};
use fusebox_tests::FakeRedis;

/// The built-in backends are registered by default.
#[test]
fn defaults_are_registered() {
    let registry = StorageRegistry::with_defaults();
    assert_eq!(registry.backends(), vec![MEMORY_BACKEND, REDIS_BACKEND]);
    assert!(StorageRegistry::new().backends().is_empty());
}

/// The redis factory uses the redis section of the settings.
#[tokio::test]
async fn redis_factory_uses_settings() {
    let server = FakeRedis::start().await.unwrap();
    let settings = StorageSettings {
        redis: RedisSettings::new("127.0.0.1", server.settings().port),
        ..Default::default()
    };

    let storage = StorageRegistry::with_defaults()
        .build(REDIS_BACKEND, &settings)
        .unwrap();
    storage.set("k", "v", None).await.unwrap();

    assert_eq!(server.store().get("k").await.unwrap().as_deref(), Some("v"));
}
