//! Error types for muster.
//!
//! All errors are strongly typed using thiserror. Nothing in this core is
//! fatal to the process: malformed events are rejected per-event, stale
//! events are dropped as an outcome (not an error), and an unassignable
//! request is a valid matcher result.

use thiserror::Error;

use crate::event::EntityKind;

/// Validation errors raised while decoding and checking change payloads
/// or distress-call input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The payload could not be decoded into the record for its kind.
    #[error("Malformed {kind} payload: {reason}")]
    MalformedPayload {
        /// Entity kind the payload claimed to be.
        kind: EntityKind,
        /// Decoder error message.
        reason: String,
    },

    /// A numeric field is outside its permitted range.
    #[error("Field '{field}' is out of range: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A geographic position is not a valid (lat, lon) pair.
    #[error("Invalid position: lat={lat} lon={lon}")]
    InvalidPosition {
        /// Reported latitude.
        lat: f64,
        /// Reported longitude.
        lon: f64,
    },

    /// A required text field is empty.
    #[error("Field '{field}' cannot be empty")]
    EmptyField {
        /// Field name.
        field: &'static str,
    },
}

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lock guarding store state was poisoned.
    #[error("poisoned lock: {context}")]
    Poisoned {
        /// Operation that observed the poisoned lock.
        context: &'static str,
    },

    /// Backend-specific failure (for non in-memory implementations).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors raised by the sync runtime when submitting work.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The bounded event queue is full; the caller should retry or shed.
    #[error("sync queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The runtime worker has shut down.
    #[error("sync runtime is disconnected")]
    Disconnected,
}

/// Top-level error type for muster operations.
#[derive(Debug, Error)]
pub enum MusterError {
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl MusterError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a store error.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns true if retrying the same call can succeed.
    ///
    /// Validation failures are deterministic; queue backpressure is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Store(_) => false,
            Self::Runtime(e) => matches!(e, RuntimeError::QueueFull { .. }),
        }
    }
}

/// Result type alias for muster operations.
pub type MusterResult<T> = Result<T, MusterError>;
