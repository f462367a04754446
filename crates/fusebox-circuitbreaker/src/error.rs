use fusebox_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while constructing a circuit breaker.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The failure threshold must be at least 1.
    #[error("failure threshold must be positive, got {0}")]
    InvalidFailureThreshold(u32),

    /// The timeout period must be at least one second.
    #[error("timeout period must be at least one second, got {0:?}")]
    InvalidTimeoutPeriod(Duration),

    /// The entry TTL would let an open circuit expire before its timeout.
    #[error("entry TTL {entry_ttl:?} must exceed the timeout period {timeout_period:?} by at least one second")]
    EntryTtlTooShort {
        entry_ttl: Duration,
        timeout_period: Duration,
    },

    /// The configured storage backend could not be built.
    #[error("failed to build storage backend: {0}")]
    Storage(#[from] StorageError),
}

impl ConfigError {
    /// Returns true if the error was caused by an unregistered backend id.
    pub fn is_unknown_backend(&self) -> bool {
        matches!(self, ConfigError::Storage(StorageError::UnknownBackend(_)))
    }
}
