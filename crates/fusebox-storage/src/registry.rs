//! Mapping from backend ids to constructors.

use crate::{MemoryStorage, RedisStorage, SharedStorage, StorageError, StorageSettings};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a storage backend.
pub type StorageFactory =
    Arc<dyn Fn(&StorageSettings) -> Result<SharedStorage, StorageError> + Send + Sync>;

/// Id of the in-process backend.
pub const MEMORY_BACKEND: &str = "memory";
/// Id of the Redis backend.
pub const REDIS_BACKEND: &str = "redis";

/// Registry of storage backends addressable by id.
///
/// Lets configuration name a backend (`storage_service = "redis"`) without the
/// caller knowing the concrete type:
///
/// ```rust
/// use fusebox_storage::{MemoryStorage, SharedStorage, StorageRegistry, StorageSettings};
/// use std::sync::Arc;
///
/// let mut registry = StorageRegistry::with_defaults();
/// registry.register("bounded", |_settings: &StorageSettings| {
///     Ok(Arc::new(MemoryStorage::with_capacity(1024)) as SharedStorage)
/// });
///
/// assert!(registry.contains("bounded"));
/// assert!(registry.build("bounded", &StorageSettings::default()).is_ok());
/// ```
#[derive(Clone, Default)]
pub struct StorageRegistry {
    factories: HashMap<String, StorageFactory>,
}

impl StorageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `"memory"` and `"redis"` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_BACKEND, |settings: &StorageSettings| {
            let storage = match settings.memory.capacity {
                Some(capacity) => MemoryStorage::with_capacity(capacity),
                None => MemoryStorage::new(),
            };
            Ok(Arc::new(storage) as SharedStorage)
        });
        registry.register(REDIS_BACKEND, |settings: &StorageSettings| {
            Ok(Arc::new(RedisStorage::from_settings(settings.redis.clone())) as SharedStorage)
        });
        registry
    }

    /// Registers a backend under `id`, replacing any previous registration.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StorageSettings) -> Result<SharedStorage, StorageError> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    /// Returns true if a backend is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Returns the registered ids in sorted order.
    pub fn backends(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Constructs the backend registered under `id`.
    pub fn build(&self, id: &str, settings: &StorageSettings) -> Result<SharedStorage, StorageError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| StorageError::UnknownBackend(id.to_owned()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(backend = id, "building storage backend");

        factory(settings)
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}
