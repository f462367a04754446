//! Backend construction settings.

use std::time::Duration;

/// Settings for every built-in backend.
///
/// Only the section matching the selected backend id is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StorageSettings {
    /// Settings for the `"memory"` backend.
    pub memory: MemorySettings,
    /// Settings for the `"redis"` backend.
    pub redis: RedisSettings,
}

/// Settings for [`MemoryStorage`](crate::MemoryStorage).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemorySettings {
    /// Maximum number of entries. `None` keeps the store unbounded.
    pub capacity: Option<usize>,
}

/// Settings for [`RedisStorage`](crate::RedisStorage).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RedisSettings {
    /// Server host name or address.
    ///
    /// Default: `127.0.0.1`
    pub host: String,
    /// Server port.
    ///
    /// Default: `6379`
    pub port: u16,
    /// Upper bound on connecting and on each command round trip, in milliseconds.
    ///
    /// Default: `5000`
    pub timeout_ms: u64,
}

impl RedisSettings {
    /// Creates settings for the given endpoint with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the per-operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the per-operation timeout.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 6379,
            timeout_ms: 5_000,
        }
    }
}
