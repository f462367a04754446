//! A circuit breaker whose state lives in a shared storage backend.
//!
//! Callers ask the breaker whether a dependency is open before calling it, and
//! report the outcome afterwards. The breaker never makes the call itself and
//! never runs timers: recovery is evaluated lazily on the next check.
//!
//! ## States
//! - **Closed**: calls are permitted (also the state of any service never reported on)
//! - **Open**: the failure threshold was reached; calls should be skipped
//! - **Half-Open**: the open timeout elapsed; the next call is a trial whose
//!   reported outcome closes or re-opens the circuit
//!
//! ## Usage
//!
//! ```rust
//! use fusebox_circuitbreaker::CircuitBreaker;
//! use fusebox_storage::MemoryStorage;
//! use std::time::Duration;
//!
//! # async fn call_inventory() -> Result<(), ()> { Ok(()) }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::builder(MemoryStorage::new())
//!     .failure_threshold(3)
//!     .timeout_period(Duration::from_secs(30))
//!     .name("edge")
//!     .build()?;
//!
//! if !breaker.is_open("inventory").await? {
//!     match call_inventory().await {
//!         Ok(()) => breaker.attempt_success("inventory").await?,
//!         Err(()) => breaker.attempt_failure("inventory").await?,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Sharing state across processes
//!
//! Point every instance at the same Redis server and they trip and recover
//! together:
//!
//! ```rust,no_run
//! use fusebox_circuitbreaker::CircuitBreaker;
//! use fusebox_storage::RedisStorage;
//!
//! # fn example() -> Result<(), fusebox_circuitbreaker::ConfigError> {
//! let breaker = CircuitBreaker::builder(RedisStorage::new("127.0.0.1", 6379))
//!     .failure_threshold(5)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Or choose the backend from configuration with [`BreakerSettings`].
//!
//! ## Storage layout
//!
//! Each service uses three keys, `circuit:<service>:state` (`"closed"`,
//! `"open"` or `"half-open"`), `circuit:<service>:failures` and
//! `circuit:<service>:lastOpened` (Unix seconds).
//!
//! ## Error Handling
//!
//! Storage failures are returned as [`StorageError`](fusebox_storage::StorageError)
//! from every operation. The breaker never guesses a state when the backend
//! cannot be reached.
//!
//! ```rust
//! use fusebox_circuitbreaker::{CircuitBreaker, ConfigError};
//! use fusebox_storage::MemoryStorage;
//!
//! let err = CircuitBreaker::builder(MemoryStorage::new())
//!     .failure_threshold(0)
//!     .build()
//!     .unwrap_err();
//! assert!(matches!(err, ConfigError::InvalidFailureThreshold(0)));
//! ```
//!
//! ## Feature Flags
//! - `tracing`: log transitions and recorded outcomes
//! - `metrics`: emit transition, rejection and outcome counters
//! - `serde`: deserialize [`BreakerSettings`]

mod circuit;
mod clock;
mod config;
mod error;
mod events;
mod keys;
mod settings;
mod state;

pub use circuit::CircuitBreaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_TIMEOUT_PERIOD,
};
pub use error::ConfigError;
pub use events::{CircuitBreakerEvent, EventListener, EventListeners};
pub use keys::CircuitKeys;
pub use settings::BreakerSettings;
pub use state::CircuitState;

pub use fusebox_storage::{SharedStorage, Storage, StorageError};
