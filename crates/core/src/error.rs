//! Error types for the transactional memory runtime
//!
//! Two families of failure exist:
//!
//! - **Conflict aborts** ([`AbortReason`]): expected, frequent, recoverable.
//!   The retry loop swallows them and re-runs the transaction body.
//! - **Fatal errors** ([`StmError`]): capacity exhaustion, invalid addresses,
//!   bad configuration. Never retried; surfaced to the caller after cleanup.
//!
//! Inside a transaction body both travel as [`TxError`], so `?` works on
//! every transactional operation.

use crate::types::Addr;
use thiserror::Error;

/// Why a transaction attempt was aborted
///
/// Every variant maps to a stable numeric [`code`](AbortReason::code) for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// A shard touched by the attempt is owned by another transaction
    LockHeld,
    /// A shard changed between reading its slot and reading the data word
    InconsistentRead,
    /// Another transaction won the compare-and-swap on a shard and now owns it
    LostRace,
    /// A read-set entry no longer matches the current shard version
    ValidationFailed,
    /// The application aborted the attempt with its own code
    Explicit(u16),
}

impl AbortReason {
    /// Number of distinct abort kinds tracked by per-reason counters
    pub const KINDS: usize = 5;

    /// Stable numeric reason code
    pub fn code(&self) -> u16 {
        match self {
            AbortReason::LockHeld => 1,
            AbortReason::InconsistentRead => 2,
            AbortReason::LostRace => 3,
            AbortReason::ValidationFailed => 1000,
            AbortReason::Explicit(code) => *code,
        }
    }

    /// Index into per-reason counter arrays
    pub fn kind_index(&self) -> usize {
        match self {
            AbortReason::LockHeld => 0,
            AbortReason::InconsistentRead => 1,
            AbortReason::LostRace => 2,
            AbortReason::ValidationFailed => 3,
            AbortReason::Explicit(_) => 4,
        }
    }

    /// True for aborts caused by another thread holding or winning a shard
    pub fn is_contention(&self) -> bool {
        matches!(self, AbortReason::LockHeld | AbortReason::LostRace)
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::LockHeld => write!(f, "lock held by another transaction"),
            AbortReason::InconsistentRead => write!(f, "inconsistent read"),
            AbortReason::LostRace => write!(f, "lost race acquiring shard"),
            AbortReason::ValidationFailed => write!(f, "read-set validation failed"),
            AbortReason::Explicit(code) => write!(f, "explicit abort ({})", code),
        }
    }
}

/// Fatal runtime errors
///
/// These are never retried. A transaction that raises one is cleaned up
/// (shards restored, allocations released) before the error reaches the
/// caller.
#[derive(Debug, Error)]
pub enum StmError {
    /// The per-transaction allocation buffer is full
    #[error("allocation buffer exhausted: at most {limit} allocations per transaction")]
    AllocCapacityExceeded {
        /// Configured buffer capacity
        limit: usize,
    },

    /// The per-transaction pending-free buffer is full
    #[error("free buffer exhausted: at most {limit} frees per transaction")]
    FreeCapacityExceeded {
        /// Configured buffer capacity
        limit: usize,
    },

    /// The arena has no free block large enough
    #[error("arena out of memory: requested {requested} words, largest free block {available}")]
    OutOfMemory {
        /// Words requested
        requested: usize,
        /// Largest contiguous free block at the time of the request
        available: usize,
    },

    /// Address outside the arena
    #[error("address {addr} outside arena of {capacity} words")]
    InvalidAddress {
        /// Offending address
        addr: Addr,
        /// Arena capacity in words
        capacity: usize,
    },

    /// Release of an address that is not the start of a live block
    #[error("address {0} is not the start of an allocated block")]
    InvalidFree(Addr),

    /// Zero-sized allocation request
    #[error("allocation size must be at least one word")]
    ZeroSizedAlloc,

    /// The configured retry budget ran out
    #[error("transaction abandoned after {attempts} attempts (last abort: {last_reason})")]
    RetryLimitExceeded {
        /// Attempts made, including the first
        attempts: u32,
        /// Reason of the final abort
        last_reason: AbortReason,
    },

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The runtime was shut down
    #[error("runtime has been shut down")]
    RuntimeStopped,

    /// No more thread ids can be encoded into ownership slots
    #[error("thread id space exhausted")]
    ThreadIdsExhausted,
}

impl StmError {
    /// Capacity errors are the programming errors of the scoped allocator
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            StmError::AllocCapacityExceeded { .. }
                | StmError::FreeCapacityExceeded { .. }
                | StmError::OutOfMemory { .. }
        )
    }
}

/// Result type for fatal-error-only operations
pub type Result<T> = std::result::Result<T, StmError>;

/// Error raised by a transactional operation
#[derive(Debug, Error)]
pub enum TxError {
    /// The attempt must be rolled back; the retry loop runs it again
    #[error("transaction aborted: {0}")]
    Abort(AbortReason),

    /// Unrecoverable; the transaction is abandoned
    #[error(transparent)]
    Fatal(#[from] StmError),
}

impl TxError {
    /// Abort reason, if this is a conflict abort
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            TxError::Abort(reason) => Some(*reason),
            TxError::Fatal(_) => None,
        }
    }

    /// Check if the attempt may succeed when re-run
    pub fn is_retryable(&self) -> bool {
        matches!(self, TxError::Abort(_))
    }
}

impl From<AbortReason> for TxError {
    fn from(reason: AbortReason) -> Self {
        TxError::Abort(reason)
    }
}

/// Result type for transactional operations
pub type TxResult<T> = std::result::Result<T, TxError>;
