//! Storage backends for the fusebox circuit breaker.
//!
//! The circuit breaker keeps no state of its own. Everything it knows about a
//! service lives in a key-value store reached through the [`Storage`] trait,
//! which is what lets several breaker instances (threads, worker processes,
//! hosts) share one view of a dependency's health.
//!
//! Two backends ship with this crate:
//!
//! - [`MemoryStorage`]: an in-process expiring cache, shared by clones.
//! - [`RedisStorage`]: a Redis client usable across processes and machines.
//!
//! ## Usage
//!
//! ```rust
//! use fusebox_storage::{MemoryStorage, Storage};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), fusebox_storage::StorageError> {
//! let storage = MemoryStorage::new();
//!
//! storage.set("greeting", "hello", None).await?;
//! assert_eq!(storage.get("greeting").await?.as_deref(), Some("hello"));
//!
//! assert_eq!(storage.increment("hits").await?, 1);
//! assert_eq!(storage.increment("hits").await?, 2);
//!
//! storage.expire("hits", Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Selecting a backend at runtime
//!
//! [`StorageRegistry`] maps a backend id to a constructor:
//!
//! ```rust
//! use fusebox_storage::{StorageRegistry, StorageSettings};
//!
//! # fn example() -> Result<(), fusebox_storage::StorageError> {
//! let registry = StorageRegistry::with_defaults();
//! let storage = registry.build("memory", &StorageSettings::default())?;
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

mod error;
mod memory;
mod redis;
mod registry;
mod resp;
mod settings;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use redis::RedisStorage;
pub use registry::{StorageFactory, StorageRegistry, MEMORY_BACKEND, REDIS_BACKEND};
pub use settings::{MemorySettings, RedisSettings, StorageSettings};

/// Future returned by every [`Storage`] operation.
pub type StorageFuture<'a, T> = BoxFuture<'a, Result<T, StorageError>>;

/// A storage backend selected at runtime.
pub type SharedStorage = Arc<dyn Storage>;

/// Key-value contract required by the circuit breaker.
///
/// Keys and values are strings. Implementations must make [`increment`]
/// atomic with respect to concurrent callers; the other operations carry no
/// cross-key guarantees.
///
/// The trait is object safe so backends can be chosen from configuration and
/// held as [`SharedStorage`].
///
/// [`increment`]: Storage::increment
pub trait Storage: Send + Sync {
    /// Returns the value stored at `key`, or `None` if it is unset or expired.
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>>;

    /// Stores `value` at `key`, replacing any existing value and TTL.
    ///
    /// A `ttl` of `None` or zero stores the value without expiry.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool>;

    /// Atomically adds one to the integer at `key` and returns the new value.
    ///
    /// An absent key counts as 0, so the first increment returns 1. Any TTL
    /// already set on the key is kept.
    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64>;

    /// Resets the TTL of an existing key without touching its value.
    ///
    /// Unlike [`set`](Storage::set), a zero `ttl` is not "no expiry": the key
    /// expires at once and is removed, matching Redis `PEXPIRE key 0` on every
    /// backend. Returns `false` if the key does not exist.
    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        (**self).get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        (**self).set(key, value, ttl)
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        (**self).increment(key)
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        (**self).expire(key, ttl)
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        (**self).get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        (**self).set(key, value, ttl)
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        (**self).increment(key)
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        (**self).expire(key, ttl)
    }
}

/// Normalizes a TTL: zero means "no expiry".
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|ttl| !ttl.is_zero())
}
