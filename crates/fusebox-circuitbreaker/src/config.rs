use crate::clock::{Clock, SystemClock};
use crate::events::{CircuitBreakerEvent, EventListener, EventListeners};
use crate::{CircuitBreaker, CircuitState, ConfigError};
use std::sync::Arc;
use std::time::Duration;

/// Default number of failures that opens a circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default time a circuit stays open before a trial call is allowed.
pub const DEFAULT_TIMEOUT_PERIOD: Duration = Duration::from_secs(60);

/// Configuration for the circuit breaker, fixed at construction.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) timeout_secs: i64,
    pub(crate) entry_ttl: Option<Duration>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) event_listeners: EventListeners,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Number of failures at which a circuit opens.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Minimum time a circuit stays open before a trial call is allowed.
    pub fn timeout_period(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unsigned_abs())
    }

    /// TTL applied to every entry the breaker writes, if any.
    pub fn entry_ttl(&self) -> Option<Duration> {
        self.entry_ttl
    }

    /// Name used in logs, metrics and events.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_secs: DEFAULT_TIMEOUT_PERIOD.as_secs() as i64,
            entry_ttl: None,
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("timeout_period", &self.timeout_period())
            .field("entry_ttl", &self.entry_ttl)
            .field("event_listeners", &self.event_listeners)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder<S> {
    storage: S,
    failure_threshold: u32,
    timeout_period: Duration,
    entry_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    event_listeners: EventListeners,
    name: String,
}

impl<S> CircuitBreakerConfigBuilder<S> {
    /// Creates a builder with default values around `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_period: DEFAULT_TIMEOUT_PERIOD,
            entry_ttl: None,
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of failures at which the circuit opens.
    ///
    /// Failures accumulate until a success is reported; there is no window.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets how long an open circuit blocks calls before allowing a trial call.
    ///
    /// Open timestamps are stored in whole seconds, so sub-second parts are
    /// truncated. Must be at least one second.
    ///
    /// Default: 60 seconds
    pub fn timeout_period(mut self, period: Duration) -> Self {
        self.timeout_period = period;
        self
    }

    /// Stores every entry the breaker writes with this TTL, and refreshes the
    /// failure counter's TTL after each failure, so services that go quiet
    /// eventually disappear from the backend.
    ///
    /// A zero TTL is the same as none. Otherwise the TTL must be at least one
    /// second longer than the timeout period, or an open circuit could vanish
    /// from the backend (and read as closed) before its timeout elapsed.
    ///
    /// Default: None (entries never expire)
    pub fn entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl).filter(|ttl| !ttl.is_zero());
        self
    }

    /// Sets the source of wall-clock time.
    ///
    /// Default: [`SystemClock`]
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a listener for every event.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Registers a callback invoked when the breaker writes a new state.
    ///
    /// Called with the service name and the state written: `Open` when the
    /// failure threshold is reached, `HalfOpen` when a check finds the open
    /// timeout elapsed.
    pub fn on_state_transition<F>(self, f: F) -> Self
    where
        F: Fn(&str, CircuitState) + Send + Sync + 'static,
    {
        self.on_event(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                service, to_state, ..
            } = event
            {
                f(service, *to_state);
            }
        })
    }

    /// Registers a callback invoked when a check finds a circuit open.
    pub fn on_call_rejected<F>(self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_event(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::CallRejected { service, .. } = event {
                f(service);
            }
        })
    }

    /// Registers a callback invoked after each reported failure, with the
    /// counter value after the increment.
    pub fn on_failure_recorded<F>(self, f: F) -> Self
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        self.on_event(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::FailureRecorded {
                service, failures, ..
            } = event
            {
                f(service, *failures);
            }
        })
    }

    /// Registers a callback invoked after each reported success.
    pub fn on_success_recorded<F>(self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_event(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::SuccessRecorded { service, .. } = event {
                f(service);
            }
        })
    }

    /// Validates the configuration and builds the circuit breaker.
    pub fn build(self) -> Result<CircuitBreaker<S>, ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(self.failure_threshold));
        }
        let timeout_secs = self.timeout_period.as_secs();
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeoutPeriod(self.timeout_period));
        }

        if let Some(entry_ttl) = self.entry_ttl {
            // lastOpened is truncated to whole seconds, so the open entry can be
            // up to a second older than the elapsed time the check computes.
            if entry_ttl.as_secs() <= timeout_secs {
                return Err(ConfigError::EntryTtlTooShort {
                    entry_ttl,
                    timeout_period: Duration::from_secs(timeout_secs),
                });
            }
        }

        let config = CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout_secs: i64::try_from(timeout_secs).unwrap_or(i64::MAX),
            entry_ttl: self.entry_ttl,
            clock: self.clock,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        Ok(CircuitBreaker::from_parts(self.storage, config))
    }
}
