use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::events::CircuitBreakerEvent;
use crate::keys::CircuitKeys;
use crate::CircuitState;
use fusebox_storage::{SharedStorage, Storage, StorageError};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::Arc;
use std::time::Instant;

/// A circuit breaker whose state lives entirely in a [`Storage`] backend.
///
/// The breaker holds only immutable configuration. Every check re-reads the
/// backend, so any number of breakers sharing a backend (across tasks,
/// processes or hosts) see the same circuits. Cloning is cheap.
///
/// The per-service entries (`state`, `failures`, `lastOpened`) are written
/// independently, never as a transaction. A concurrent reader can observe a
/// half-applied update, such as `open` with the previous `lastOpened`, or
/// `closed` with a non-zero counter. Both are harmless: `lastOpened` is only
/// consulted while the state is `open`, and the counter only matters between
/// resets.
pub struct CircuitBreaker<S = SharedStorage> {
    storage: S,
    config: Arc<CircuitBreakerConfig>,
}

impl<S> CircuitBreaker<S> {
    /// Creates a builder around `storage`.
    pub fn builder(storage: S) -> CircuitBreakerConfigBuilder<S> {
        CircuitBreakerConfigBuilder::new(storage)
    }

    /// Creates a breaker with the default threshold (5) and timeout (60s).
    pub fn new(storage: S) -> Self {
        Self::from_parts(storage, CircuitBreakerConfig::default())
    }

    pub(crate) fn from_parts(storage: S, config: CircuitBreakerConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    /// Returns the breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> CircuitBreaker<S> {
    /// Returns true if calls to `service` should be skipped.
    ///
    /// An open circuit whose timeout has elapsed is moved to half-open here,
    /// and `false` is returned so the caller can try the dependency. The
    /// outcome the caller then reports decides whether the circuit closes or
    /// opens again. Checks on a closed, half-open or never-seen service
    /// perform no writes.
    pub async fn is_open(&self, service: &str) -> Result<bool, StorageError> {
        let keys = CircuitKeys::new(service);

        if self.read_state(service, &keys).await? != CircuitState::Open {
            return Ok(false);
        }

        let last_opened = self
            .storage
            .get(&keys.last_opened)
            .await?
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let elapsed = self.config.clock.now().saturating_sub(last_opened);

        if elapsed > self.config.timeout_secs {
            self.write(&keys.state, CircuitState::HalfOpen.as_str())
                .await?;
            self.transitioned(service, CircuitState::HalfOpen);
            return Ok(false);
        }

        self.rejected(service);
        Ok(true)
    }

    /// Reports a successful call: closes the circuit and clears the counter.
    pub async fn attempt_success(&self, service: &str) -> Result<(), StorageError> {
        let keys = CircuitKeys::new(service);

        self.write(&keys.state, CircuitState::Closed.as_str())
            .await?;
        self.write(&keys.failures, "0").await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(breaker = %self.config.name, service, "success recorded, circuit closed");

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_outcomes_total",
            "circuitbreaker" => self.config.name.clone(),
            "service" => service.to_owned(),
            "outcome" => "success"
        )
        .increment(1);

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                service: service.to_owned(),
            });
        Ok(())
    }

    /// Reports a failed call: counts it, and opens the circuit once the
    /// counter reaches the failure threshold.
    ///
    /// Below the threshold only the counter changes. At or above it, the
    /// state is set to open and the open timestamp is restamped, which is how
    /// a failed half-open trial re-opens the circuit.
    pub async fn attempt_failure(&self, service: &str) -> Result<(), StorageError> {
        let keys = CircuitKeys::new(service);

        let failures = self.storage.increment(&keys.failures).await?;
        if let Some(ttl) = self.config.entry_ttl {
            self.storage.expire(&keys.failures, ttl).await?;
        }
        let failures = u64::try_from(failures).unwrap_or(0);

        #[cfg(feature = "tracing")]
        tracing::debug!(breaker = %self.config.name, service, failures, "failure recorded");

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_outcomes_total",
            "circuitbreaker" => self.config.name.clone(),
            "service" => service.to_owned(),
            "outcome" => "failure"
        )
        .increment(1);

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                service: service.to_owned(),
                failures,
            });

        if failures >= u64::from(self.config.failure_threshold) {
            let now = self.config.clock.now();
            self.write(&keys.state, CircuitState::Open.as_str())
                .await?;
            self.write(&keys.last_opened, &now.to_string()).await?;
            self.transitioned(service, CircuitState::Open);
        }
        Ok(())
    }

    /// Returns the stored state of `service` without applying the open
    /// timeout. Never writes.
    pub async fn state(&self, service: &str) -> Result<CircuitState, StorageError> {
        self.read_state(service, &CircuitKeys::new(service)).await
    }

    /// Returns the current failure counter of `service`. Never writes.
    pub async fn failure_count(&self, service: &str) -> Result<u64, StorageError> {
        let keys = CircuitKeys::new(service);
        Ok(self
            .storage
            .get(&keys.failures)
            .await?
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0))
    }

    async fn read_state(
        &self,
        _service: &str,
        keys: &CircuitKeys,
    ) -> Result<CircuitState, StorageError> {
        let Some(stored) = self.storage.get(&keys.state).await? else {
            return Ok(CircuitState::Closed);
        };
        match CircuitState::from_stored(&stored) {
            Some(state) => Ok(state),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    breaker = %self.config.name,
                    service = _service,
                    stored = %stored,
                    "unrecognized circuit state, treating as closed"
                );
                Ok(CircuitState::Closed)
            }
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set(key, value, self.config.entry_ttl).await?;
        Ok(())
    }

    fn transitioned(&self, service: &str, to_state: CircuitState) {
        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %self.config.name, service, to = %to_state, "Circuit state transition");

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_transitions_total",
            "circuitbreaker" => self.config.name.clone(),
            "service" => service.to_owned(),
            "to" => to_state.label()
        )
        .increment(1);

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                service: service.to_owned(),
                to_state,
            });
    }

    fn rejected(&self, service: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(breaker = %self.config.name, service, "circuit open, call rejected");

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_calls_rejected_total",
            "circuitbreaker" => self.config.name.clone(),
            "service" => service.to_owned()
        )
        .increment(1);

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                service: service.to_owned(),
            });
    }
}

impl<S: Clone> Clone for CircuitBreaker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> std::fmt::Debug for CircuitBreaker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
