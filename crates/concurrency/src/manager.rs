//! Shared runtime state
//!
//! The [`TransactionManager`] owns everything threads share:
//!
//! - the ownership table, one slot per shard
//! - the global version clock
//! - the word arena
//! - aggregate commit and abort counters
//!
//! ## Version Clock
//!
//! The clock only moves when a transaction with a non-empty write-set
//! commits. Each such commit takes `previous + 1` as its version and stamps
//! it into every shard it releases, so versions stamped into the table are
//! strictly increasing across commits.
//!
//! Nothing here is locked for the duration of a transaction. Threads meet
//! only in compare-and-swap on slots, the clock `fetch_add`, and the arena
//! allocator.

use crate::stats::{GlobalStats, StmStats, ThreadStats};
use shardstm_core::config::StmConfig;
use shardstm_core::error::{Result, StmError};
use shardstm_core::types::ThreadId;
use shardstm_storage::{Arena, OwnershipTable};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Runtime-wide transaction state
pub struct TransactionManager {
    /// Global version counter
    ///
    /// Monotonically increasing. Each committing writer increments by 1.
    version: AtomicU64,

    /// Next thread ID
    ///
    /// Starts at 1; every registered thread gets a distinct id that fits in
    /// an ownership slot.
    next_thread_id: AtomicUsize,

    table: OwnershipTable,
    arena: Arena,
    stats: GlobalStats,
    config: StmConfig,
    stopped: AtomicBool,
}

impl TransactionManager {
    /// Create a manager for a validated configuration
    pub fn new(config: StmConfig) -> Result<Self> {
        config.validate()?;
        Ok(TransactionManager {
            version: AtomicU64::new(0),
            next_thread_id: AtomicUsize::new(1),
            table: OwnershipTable::new(config.shard_count),
            arena: Arena::new(config.arena_words),
            stats: GlobalStats::default(),
            config,
            stopped: AtomicBool::new(false),
        })
    }

    /// Configuration the runtime was started with
    pub fn config(&self) -> &StmConfig {
        &self.config
    }

    /// Shard ownership table
    #[inline]
    pub fn table(&self) -> &OwnershipTable {
        &self.table
    }

    /// Transactional memory
    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next commit version (increment global version)
    ///
    /// A version is allocated after read-set validation succeeds and is
    /// always published, so versions stamped into the table have no gaps.
    pub fn allocate_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Hand out a fresh thread id
    ///
    /// Fails once the runtime is stopped, or if the id space that fits into a
    /// slot word is exhausted.
    pub fn register_thread(&self) -> Result<ThreadId> {
        if self.is_stopped() {
            return Err(StmError::RuntimeStopped);
        }
        let id = self.next_thread_id.fetch_add(1, Ordering::Relaxed);
        if id > ThreadId::MAX {
            return Err(StmError::ThreadIdsExhausted);
        }
        Ok(ThreadId::new(id))
    }

    /// Number of thread ids handed out so far
    pub fn registered_threads(&self) -> usize {
        self.next_thread_id.load(Ordering::Relaxed) - 1
    }

    /// Add a stopping thread's counters to the aggregate
    pub fn fold(&self, local: &ThreadStats) {
        self.stats.fold(local);
    }

    /// Snapshot of the aggregate counters
    pub fn stats(&self) -> StmStats {
        self.stats.snapshot()
    }

    /// Refuse new threads from now on
    ///
    /// Returns `false` if the runtime was already stopped.
    pub fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    /// Check whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("version", &self.current_version())
            .field("table", &self.table)
            .field("arena", &self.arena)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
