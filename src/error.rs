//! Unified error types for shardstm.
//!
//! This module provides a clean error type that wraps internal errors
//! and presents a consistent interface to users.

use shardstm_core::{AbortReason, StmError, TxError};
use thiserror::Error;

/// All shardstm errors.
///
/// Conflict aborts only show up here when a transaction was run once
/// ([`ThreadContext::try_transaction`](crate::ThreadContext::try_transaction))
/// or ran out of retries; the retry loop handles them otherwise.
#[derive(Debug, Error)]
pub enum Error {
    /// A transaction attempt aborted
    #[error("conflict: {0}")]
    Conflict(AbortReason),

    /// The configured retry budget ran out
    #[error("gave up after {attempts} attempts (last abort: {last_reason})")]
    RetryLimitExceeded {
        /// Attempts made, including the first
        attempts: u32,
        /// Reason of the final abort
        last_reason: AbortReason,
    },

    /// A per-transaction buffer or the arena is exhausted
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Address outside the arena or not an allocated block
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The runtime has been shut down
    #[error("runtime stopped")]
    Stopped,

    /// Internal error (resource exhaustion or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for shardstm operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Conflicts and an exhausted retry budget are retryable: the runtime
    /// gave up on that call, but the transaction itself is well-formed and a
    /// new call may commit once contention drops.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::RetryLimitExceeded { .. })
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this error can never succeed on retry.
    ///
    /// Capacity, address, configuration and shutdown errors are fatal.
    /// [`Error::RetryLimitExceeded`] is not.
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }

    /// Abort reason behind a conflict or exhausted retry budget.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            Error::Conflict(reason) => Some(*reason),
            Error::RetryLimitExceeded { last_reason, .. } => Some(*last_reason),
            _ => None,
        }
    }
}

// Convert from internal core errors
impl From<StmError> for Error {
    fn from(e: StmError) -> Self {
        match e {
            StmError::AllocCapacityExceeded { .. }
            | StmError::FreeCapacityExceeded { .. }
            | StmError::OutOfMemory { .. } => Error::Capacity(e.to_string()),
            StmError::InvalidAddress { .. } | StmError::InvalidFree(_) | StmError::ZeroSizedAlloc => {
                Error::InvalidAddress(e.to_string())
            }
            StmError::RetryLimitExceeded {
                attempts,
                last_reason,
            } => Error::RetryLimitExceeded {
                attempts,
                last_reason,
            },
            StmError::InvalidConfig(msg) => Error::InvalidConfig(msg),
            StmError::RuntimeStopped => Error::Stopped,
            StmError::ThreadIdsExhausted => Error::Internal(e.to_string()),
        }
    }
}

impl From<TxError> for Error {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Abort(reason) => Error::Conflict(reason),
            TxError::Fatal(inner) => inner.into(),
        }
    }
}
