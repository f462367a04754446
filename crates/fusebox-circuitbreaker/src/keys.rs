//! Storage key layout: `circuit:<service>:<field>`.

const PREFIX: &str = "circuit";
const STATE: &str = "state";
const FAILURES: &str = "failures";
const LAST_OPENED: &str = "lastOpened";

/// The three storage keys that make up one service's circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitKeys {
    /// Holds the persisted [`CircuitState`](crate::CircuitState) literal.
    pub state: String,
    /// Holds the failure counter.
    pub failures: String,
    /// Holds the Unix timestamp (seconds) of the last transition to open.
    pub last_opened: String,
}

impl CircuitKeys {
    /// Builds the keys for `service`.
    pub fn new(service: &str) -> Self {
        Self {
            state: format!("{PREFIX}:{service}:{STATE}"),
            failures: format!("{PREFIX}:{service}:{FAILURES}"),
            last_opened: format!("{PREFIX}:{service}:{LAST_OPENED}"),
        }
    }
}
