use std::time::Duration;
use thiserror::Error;

/// The single failure kind surfaced by every storage backend.
///
/// Each backend translates its own lower-level failures (socket errors,
/// malformed replies, poisoned locks) into one of these variants, so callers
/// only ever need to handle `StorageError`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Establishing a connection to the backend failed.
    #[error("failed to connect to storage backend at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// An established connection failed mid-operation.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend did not answer within its configured bound.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with an error reply.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend answered with something that could not be decoded.
    #[error("unexpected storage reply: {0}")]
    Protocol(String),

    /// `increment` was applied to a value that is not an integer.
    #[error("value stored at `{key}` is not an integer")]
    NotAnInteger { key: String },

    /// The in-process store's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// No backend is registered under the requested id.
    #[error("unknown storage backend `{0}`")]
    UnknownBackend(String),
}

impl StorageError {
    /// Returns true if the operation was abandoned because it timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout(_))
    }

    /// Returns true if the failure came from the transport (connect or i/o).
    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connect { .. } | StorageError::Io(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}
