//! Error types for Strata.
//!
//! This module provides a unified error type for all Strata operations.
//! Error codes follow the pattern `STRATA-XXX` for easy debugging.
//!
//! A missing key is deliberately *not* an error: lookups return `Option`,
//! since storing and finding duplicate keys is a normal part of the API.

use thiserror::Error;

/// Result type alias for Strata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Strata operations.
///
/// Growth failures are all-or-nothing: an operation that returns
/// [`Error::Allocation`] has not modified the container.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not satisfy a growth request (STRATA-001).
    #[error("[STRATA-001] Allocation of {requested_bytes} bytes failed")]
    Allocation {
        /// Size of the allocation that was refused.
        requested_bytes: usize,
    },

    /// A positional precondition was violated (STRATA-002).
    #[error("[STRATA-002] Index {index} out of bounds for length {len}")]
    OutOfBounds {
        /// Offending row index.
        index: usize,
        /// Row count at the time of the call.
        len: usize,
    },

    /// The container reached its maximum row count (STRATA-003).
    #[error("[STRATA-003] Row capacity exhausted: limit is {max_rows} rows")]
    CapacityExhausted {
        /// Configured or structural row limit.
        max_rows: usize,
    },

    /// An internal probe-slot invariant failed (STRATA-004).
    ///
    /// Indicates a prior invariant breach (for example an out-of-band
    /// mutation of a key column). Not recoverable by further table
    /// operations; the index must be rebuilt from source data.
    #[error("[STRATA-004] Hash index corrupted: {0}")]
    IndexCorrupted(String),

    /// Configuration error (STRATA-005).
    #[error("[STRATA-005] Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the error code (e.g., "STRATA-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Allocation { .. } => "STRATA-001",
            Self::OutOfBounds { .. } => "STRATA-002",
            Self::CapacityExhausted { .. } => "STRATA-003",
            Self::IndexCorrupted(_) => "STRATA-004",
            Self::Config(_) => "STRATA-005",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Corruption is the only non-recoverable failure: the other variants
    /// leave the container exactly as it was before the call.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexCorrupted(_))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
