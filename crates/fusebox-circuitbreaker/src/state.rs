use std::fmt;

/// Represents the state of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    #[default]
    Closed,
    /// The circuit is open and calls should be skipped.
    Open,
    /// The open timeout has elapsed; the next call is a trial.
    HalfOpen,
}

impl CircuitState {
    /// Returns the literal persisted in storage for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }

    /// Parses a persisted state literal. Unknown literals yield `None`.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "closed" => Some(CircuitState::Closed),
            "open" => Some(CircuitState::Open),
            "half-open" => Some(CircuitState::HalfOpen),
            _ => None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn label(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
