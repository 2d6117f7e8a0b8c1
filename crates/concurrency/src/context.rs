//! Per-thread transaction driver
//!
//! A [`ThreadContext`] is a registered thread's handle on the runtime. It owns
//! the thread's log, scoped allocator and counters, and runs transaction
//! bodies:
//!
//! - [`transaction`](ThreadContext::transaction) re-runs the body after every
//!   conflict abort until it commits (or the retry budget runs out)
//! - [`try_transaction`](ThreadContext::try_transaction) runs it once
//!
//! Every failed attempt is rolled back before the body runs again or the
//! error is returned.

use crate::allocator::ScopedAllocator;
use crate::log::TransactionLog;
use crate::manager::TransactionManager;
use crate::stats::ThreadStats;
use crate::transaction::Transaction;
use shardstm_core::error::{AbortReason, Result, StmError, TxError, TxResult};
use shardstm_core::types::ThreadId;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// A thread's handle on the runtime
///
/// Stats are folded into the runtime aggregate exactly once, by
/// [`stop`](Self::stop) or on drop.
pub struct ThreadContext {
    manager: Arc<TransactionManager>,
    id: ThreadId,
    log: TransactionLog,
    scoped: ScopedAllocator,
    stats: ThreadStats,
    last_abort: Option<AbortReason>,
    folded: bool,
}

impl ThreadContext {
    /// Register a new thread with the runtime
    pub fn new(manager: Arc<TransactionManager>) -> Result<Self> {
        let id = manager.register_thread()?;
        let config = manager.config();
        let log = TransactionLog::new(config.shard_count);
        let scoped = ScopedAllocator::new(config.max_allocs_per_tx, config.max_frees_per_tx);
        debug!(thread = %id, "thread started");
        Ok(ThreadContext {
            manager,
            id,
            log,
            scoped,
            stats: ThreadStats::default(),
            last_abort: None,
            folded: false,
        })
    }

    /// This thread's id
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Counters of this thread so far
    pub fn stats(&self) -> &ThreadStats {
        &self.stats
    }

    /// Reason of the most recent aborted attempt
    pub fn last_abort_reason(&self) -> Option<AbortReason> {
        self.last_abort
    }

    /// Run `body` as a transaction, retrying until it commits
    ///
    /// Conflict aborts, including explicit [`Transaction::abort`], roll the
    /// attempt back and run the body again. Fatal errors are returned after
    /// rollback. With `max_retries` configured, giving up returns
    /// [`StmError::RetryLimitExceeded`].
    ///
    /// The body may run many times, so side effects outside the transaction
    /// must be idempotent.
    pub fn transaction<F, T>(&mut self, mut body: F) -> Result<T>
    where
        F: FnMut(&mut Transaction<'_>) -> TxResult<T>,
    {
        let max_retries = self.manager.config().max_retries;
        let yield_on_conflict = self.manager.config().yield_on_conflict;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            match self.attempt(&mut body) {
                Ok(value) => {
                    self.stats.record_commit();
                    return Ok(value);
                }
                Err(TxError::Abort(reason)) => {
                    self.record_abort(reason);
                    if let Some(max) = max_retries {
                        if attempts > max {
                            warn!(
                                thread = %self.id,
                                attempts,
                                reason = reason.code(),
                                "transaction retry budget exhausted"
                            );
                            self.stats.record_abandoned();
                            return Err(StmError::RetryLimitExceeded {
                                attempts,
                                last_reason: reason,
                            });
                        }
                    }
                    if yield_on_conflict && reason.is_contention() {
                        std::thread::yield_now();
                    }
                }
                Err(TxError::Fatal(e)) => {
                    self.record_fatal(&e);
                    return Err(e);
                }
            }
        }
    }

    /// Run `body` as a single attempt
    ///
    /// An abort is returned to the caller instead of retried; the attempt is
    /// rolled back either way.
    pub fn try_transaction<F, T>(&mut self, body: F) -> TxResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> TxResult<T>,
    {
        match self.attempt(body) {
            Ok(value) => {
                self.stats.record_commit();
                Ok(value)
            }
            Err(TxError::Abort(reason)) => {
                self.record_abort(reason);
                self.stats.record_abandoned();
                Err(TxError::Abort(reason))
            }
            Err(TxError::Fatal(e)) => {
                self.record_fatal(&e);
                Err(TxError::Fatal(e))
            }
        }
    }

    /// Fold this thread's counters into the runtime and unregister
    pub fn stop(mut self) -> ThreadStats {
        self.fold();
        self.stats
    }

    fn attempt<F, T>(&mut self, body: F) -> TxResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> TxResult<T>,
    {
        let mut tx = Transaction::begin(&self.manager, self.id, &mut self.log, &mut self.scoped);
        let outcome = body(&mut tx).and_then(|value| tx.commit().map(|_| value));
        match outcome {
            Ok(value) => Ok(value),
            Err(TxError::Fatal(e)) => {
                // A body that read an inconsistent snapshot may fail for
                // reasons that vanish on a clean retry.
                let err = match tx.validate() {
                    Ok(()) => TxError::Fatal(e),
                    Err(abort) => abort,
                };
                tx.rollback();
                Err(err)
            }
            Err(abort) => {
                tx.rollback();
                Err(abort)
            }
        }
    }

    fn record_abort(&mut self, reason: AbortReason) {
        trace!(thread = %self.id, reason = reason.code(), "transaction aborted");
        self.stats.record_abort(reason);
        self.last_abort = Some(reason);
    }

    fn record_fatal(&mut self, e: &StmError) {
        if e.is_capacity() {
            error!(thread = %self.id, error = %e, "transaction abandoned");
        } else {
            debug!(thread = %self.id, error = %e, "transaction abandoned");
        }
        self.stats.record_abandoned();
    }

    fn fold(&mut self) {
        if self.folded {
            return;
        }
        self.folded = true;
        self.manager.fold(&self.stats);
        debug!(
            thread = %self.id,
            commits = self.stats.commits,
            aborts = self.stats.aborts,
            "thread stopped"
        );
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        self.fold();
    }
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("id", &self.id)
            .field("stats", &self.stats)
            .field("last_abort", &self.last_abort)
            .finish()
    }
}
