//! Declarative configuration: pick a backend by id and set the thresholds.

use crate::config::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_TIMEOUT_PERIOD};
use crate::{CircuitBreaker, ConfigError};
use fusebox_storage::{SharedStorage, StorageRegistry, StorageSettings, MEMORY_BACKEND};
use std::time::Duration;

/// Configuration surface for a breaker whose backend is chosen by name.
///
/// With the `serde` feature every field is optional when deserializing:
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use fusebox_circuitbreaker::BreakerSettings;
///
/// let settings: BreakerSettings = serde_json::from_str(r#"{
///     "storage_service": "redis",
///     "failure_threshold": 3,
///     "storage": { "redis": { "host": "10.0.0.7" } }
/// }"#)?;
///
/// assert_eq!(settings.timeout_period, 60);
/// assert_eq!(settings.storage.redis.port, 6379);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakerSettings {
    /// Id of the storage backend in the registry.
    ///
    /// Default: `"memory"`
    pub storage_service: String,
    /// Number of failures that opens a circuit.
    ///
    /// Default: 5
    pub failure_threshold: u32,
    /// Seconds an open circuit blocks calls before a trial call.
    ///
    /// Default: 60
    pub timeout_period: u64,
    /// Optional TTL in seconds for every entry the breaker writes. Must be
    /// greater than `timeout_period`.
    ///
    /// Default: none
    pub entry_ttl: Option<u64>,
    /// Name used in logs, metrics and events.
    ///
    /// Default: `<unnamed>`
    pub name: String,
    /// Backend-specific settings.
    pub storage: StorageSettings,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            storage_service: MEMORY_BACKEND.to_owned(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_period: DEFAULT_TIMEOUT_PERIOD.as_secs(),
            entry_ttl: None,
            name: String::from("<unnamed>"),
            storage: StorageSettings::default(),
        }
    }
}

impl BreakerSettings {
    /// Builds a breaker using the built-in backends.
    pub fn build(&self) -> Result<CircuitBreaker<SharedStorage>, ConfigError> {
        self.build_with(&StorageRegistry::with_defaults())
    }

    /// Builds a breaker, resolving `storage_service` against `registry`.
    pub fn build_with(
        &self,
        registry: &StorageRegistry,
    ) -> Result<CircuitBreaker<SharedStorage>, ConfigError> {
        let storage = registry.build(&self.storage_service, &self.storage)?;

        let mut builder = CircuitBreaker::builder(storage)
            .failure_threshold(self.failure_threshold)
            .timeout_period(Duration::from_secs(self.timeout_period))
            .name(self.name.clone());
        if let Some(ttl) = self.entry_ttl {
            builder = builder.entry_ttl(Duration::from_secs(ttl));
        }
        builder.build()
    }
}
