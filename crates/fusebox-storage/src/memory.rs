//! In-process expiring store.

use crate::{effective_ttl, Storage, StorageError, StorageFuture};
use futures::future;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Entry with an optional expiry deadline.
#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: effective_ttl(ttl).map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// A single-process key-value store with per-entry TTLs.
///
/// Clones share the same entries, so one `MemoryStorage` can back every
/// breaker in a process. Expired entries are dropped lazily when touched, or
/// eagerly with [`purge_expired`](MemoryStorage::purge_expired).
///
/// All operations run under one lock, which makes `increment` a true
/// read-modify-write: concurrent reporters never lose an update.
///
/// By default the store is unbounded. [`with_capacity`](MemoryStorage::with_capacity)
/// caps the number of entries and evicts the least recently used one when full.
#[derive(Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<LruCache<String, Entry>>>,
}

impl MemoryStorage {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::unbounded())),
        }
    }

    /// Creates a store holding at most `capacity` entries.
    ///
    /// A capacity of zero is treated as unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Arc::new(Mutex::new(cache)),
        }
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let mut entries = self.entries.lock()?;
        let now = Instant::now();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        Ok(expired.len())
    }

    /// Removes all entries.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.entries.lock()?.clear();
        Ok(())
    }

    fn get_now(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        entries.pop(key);
        Ok(None)
    }

    fn set_now(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock()?;
        entries.put(key.to_owned(), Entry::new(value.to_owned(), ttl));
        Ok(true)
    }

    fn increment_now(&self, key: &str) -> Result<i64, StorageError> {
        let mut entries = self.entries.lock()?;
        let now = Instant::now();

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| StorageError::NotAnInteger {
                        key: key.to_owned(),
                    })?;
                (current, entry.expires_at)
            }
            // Absent or expired keys start from zero.
            _ => (0, None),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::Backend("increment would overflow".into()))?;
        entries.put(
            key.to_owned(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    fn expire_now(&self, key: &str, ttl: Duration) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock()?;
        let now = Instant::now();

        let live = entries.get(key).is_some_and(|entry| !entry.is_expired(now));
        if !live {
            entries.pop(key);
            return Ok(false);
        }

        if ttl.is_zero() {
            entries.pop(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(now + ttl);
        }
        Ok(true)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("len", &self.len())
            .finish()
    }
}

impl Storage for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(future::ready(self.get_now(key)))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        Box::pin(future::ready(self.set_now(key, value, ttl)))
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        Box::pin(future::ready(self.increment_now(key)))
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        Box::pin(future::ready(self.expire_now(key, ttl)))
    }
}
