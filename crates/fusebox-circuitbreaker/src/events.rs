//! Events emitted by the circuit breaker, and the listeners that receive them.

use crate::CircuitState;
use std::sync::Arc;
use std::time::Instant;

/// Events emitted by the circuit breaker.
///
/// Each event names the breaker that emitted it (`pattern_name`) and the
/// service the report or check was about.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker wrote a new state for a service.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        service: String,
        to_state: CircuitState,
    },
    /// A state check found the circuit open.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        service: String,
    },
    /// A failure was reported; `failures` is the counter after the increment.
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        service: String,
        failures: u64,
    },
    /// A success was reported.
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
        service: String,
    },
}

impl CircuitBreakerEvent {
    /// Returns the type of event (e.g. `"state_transition"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
        }
    }

    /// Returns when the event occurred.
    pub fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the name of the breaker that emitted the event.
    pub fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::FailureRecorded { pattern_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { pattern_name, .. } => pattern_name,
        }
    }

    /// Returns the service the event is about.
    pub fn service(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { service, .. }
            | CircuitBreakerEvent::CallRejected { service, .. }
            | CircuitBreakerEvent::FailureRecorded { service, .. }
            | CircuitBreakerEvent::SuccessRecorded { service, .. } => service,
        }
    }
}

/// Receives circuit breaker events.
///
/// Implemented for any `Fn(&CircuitBreakerEvent) + Send + Sync`.
pub trait EventListener: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &CircuitBreakerEvent);
}

impl<F> EventListener for F
where
    F: Fn(&CircuitBreakerEvent) + Send + Sync,
{
    fn on_event(&self, event: &CircuitBreakerEvent) {
        self(event)
    }
}

/// A collection of event listeners.
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventListeners {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every listener.
    ///
    /// A panicking listener does not stop the others from being called, and
    /// never propagates into the breaker operation that emitted the event.
    pub fn emit(&self, event: &CircuitBreakerEvent) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.len())
            .finish()
    }
}
