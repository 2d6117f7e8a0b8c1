//! One transaction attempt
//!
//! A [`Transaction`] borrows its thread's log and allocator buffers for the
//! duration of a single attempt. Application code drives it through
//! [`load`](Transaction::load), [`store`](Transaction::store),
//! [`alloc`](Transaction::alloc) and [`free`](Transaction::free); the thread
//! context decides whether the attempt commits or rolls back.
//!
//! ## Locking
//!
//! Stores lock eagerly: the first store to a shard takes ownership of its
//! slot with a compare-and-swap, and the shard stays owned until commit or
//! rollback. Loads never lock; they record the shard version they saw and
//! rely on validation.
//!
//! ## Validation
//!
//! An entry of the read-set is still valid if its shard is free at the version
//! that was observed, or is owned by this transaction and was at that version
//! when it was acquired. Validation runs at commit of every writing
//! transaction, whenever an acquire loses to a concurrent commit, and before a
//! fatal error is reported.
//!
//! ## Commit
//!
//! ```text
//! 1. validate read-set               -> ValidationFailed
//! 2. version = clock.fetch_add(1) + 1
//! 3. Release fence
//! 4. per owned shard: write pending words, release(shard, version)
//! 5. finalize scoped allocations
//! ```
//!
//! Each shard release is that shard's linearization point.

use crate::allocator::ScopedAllocator;
use crate::log::{ReadEntry, TransactionLog};
use crate::manager::TransactionManager;
use shardstm_core::error::{AbortReason, TxError, TxResult};
use shardstm_core::types::{Addr, ThreadId, Word};
use shardstm_storage::{Slot, SlotState};
use std::sync::atomic::{fence, Ordering};

/// Lifecycle of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Body is running; loads and stores are accepted
    Active,
    /// Writes are published
    Committed,
    /// Rolled back; nothing it did is visible
    Aborted,
}

/// A running transaction attempt
///
/// Dropping an attempt that neither committed nor rolled back (for example
/// when the body panics) rolls it back, so owned shards never leak.
pub struct Transaction<'a> {
    manager: &'a TransactionManager,
    id: ThreadId,
    log: &'a mut TransactionLog,
    scoped: &'a mut ScopedAllocator,
    status: TransactionStatus,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(
        manager: &'a TransactionManager,
        id: ThreadId,
        log: &'a mut TransactionLog,
        scoped: &'a mut ScopedAllocator,
    ) -> Self {
        log.clear();
        Transaction {
            manager,
            id,
            log,
            scoped,
            status: TransactionStatus::Active,
        }
    }

    /// Thread running this attempt
    pub fn thread_id(&self) -> ThreadId {
        self.id
    }

    /// Current state of the attempt
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Number of read-set entries recorded so far
    pub fn read_count(&self) -> usize {
        self.log.reads.len()
    }

    /// Number of distinct addresses stored to so far
    pub fn write_count(&self) -> usize {
        self.log.writes.len()
    }

    /// Read the word at `addr`
    ///
    /// Returns this transaction's own pending value if it stored to `addr`.
    /// Aborts with `LockHeld` if another transaction owns the shard and with
    /// `InconsistentRead` if a commit raced the read.
    pub fn load(&mut self, addr: Addr) -> TxResult<Word> {
        let manager = self.manager;
        let table = manager.table();
        manager.arena().word(addr)?;
        let shard = table.shard_of(addr);

        if let Some(pending) = self.log.writes.lookup(shard, addr) {
            return Ok(pending);
        }

        self.read_observed(addr, shard, table.read(shard))
    }

    /// Read `addr` given the slot of its shard as observed before the read
    pub(crate) fn read_observed(
        &mut self,
        addr: Addr,
        shard: usize,
        slot: Slot,
    ) -> TxResult<Word> {
        let manager = self.manager;
        let word = manager.arena().word(addr)?;
        match slot.state() {
            SlotState::Owned { owner } if owner == self.id => Ok(word.load(Ordering::Relaxed)),
            SlotState::Owned { .. } => Err(AbortReason::LockHeld.into()),
            SlotState::Free { version } => {
                let value = word.load(Ordering::Relaxed);
                fence(Ordering::Acquire);
                if manager.table().reread(shard) != slot {
                    return Err(AbortReason::InconsistentRead.into());
                }
                self.log.reads.push(ReadEntry {
                    addr,
                    shard,
                    version,
                });
                Ok(value)
            }
        }
    }

    /// Buffer a store of `value` to `addr`
    ///
    /// Takes ownership of the address's shard on first use. Aborts with
    /// `LockHeld` if another transaction already owns it and with `LostRace`
    /// if another transaction takes it first.
    pub fn store(&mut self, addr: Addr, value: Word) -> TxResult<()> {
        let manager = self.manager;
        let table = manager.table();
        manager.arena().word(addr)?;
        let shard = table.shard_of(addr);

        self.acquire_observed(shard, table.read(shard))?;
        self.log.writes.upsert(shard, addr, value);
        Ok(())
    }

    /// Make this attempt the owner of `shard`, starting from an observed slot
    ///
    /// Spins only while the CAS loses to a slot that is still free; an owned
    /// observation ends the loop with `LockHeld` or `LostRace`.
    pub(crate) fn acquire_observed(&mut self, shard: usize, observed: Slot) -> TxResult<()> {
        let manager = self.manager;
        let table = manager.table();
        let mut slot = observed;
        loop {
            match slot.state() {
                SlotState::Owned { owner } if owner == self.id => break,
                SlotState::Owned { .. } => return Err(AbortReason::LockHeld.into()),
                SlotState::Free { version } => match table.try_acquire(shard, slot, self.id) {
                    Ok(()) => {
                        self.log.writes.take_ownership(shard, version);
                        break;
                    }
                    Err(current) if current.is_owned() => {
                        return Err(AbortReason::LostRace.into());
                    }
                    Err(current) => {
                        // A commit moved the version under us. Anything read
                        // from this shard is stale if validation says so.
                        self.validate()?;
                        std::hint::spin_loop();
                        slot = current;
                    }
                },
            }
        }
        Ok(())
    }

    /// Allocate `words` zeroed words that live only if this attempt commits
    pub fn alloc(&mut self, words: usize) -> TxResult<Addr> {
        self.scoped.ensure_alloc_capacity()?;
        let addr = self.manager.arena().allocate(words)?;
        self.scoped.record_alloc(addr)?;
        Ok(addr)
    }

    /// Free the block at `addr` once this attempt commits
    ///
    /// `addr` must be the start of a live block not already freed by this
    /// attempt; anything else is the fatal `InvalidFree`. The first word is
    /// cleared through a transactional store, so a concurrent user of the
    /// block conflicts with this transaction.
    pub fn free(&mut self, addr: Addr) -> TxResult<()> {
        self.scoped.check_free(self.manager.arena(), addr)?;
        self.store(addr, 0)?;
        self.scoped.record_free(addr)?;
        Ok(())
    }

    /// Abort with an application code
    ///
    /// Return the error from the body: `return Err(tx.abort(7))`.
    pub fn abort(&self, code: u16) -> TxError {
        TxError::Abort(AbortReason::Explicit(code))
    }

    /// Check every read-set entry against the current shard versions
    pub fn validate(&self) -> TxResult<()> {
        let table = self.manager.table();
        for entry in self.log.reads.iter() {
            let valid = match table.read(entry.shard).state() {
                SlotState::Free { version } => version == entry.version,
                SlotState::Owned { owner } => {
                    owner == self.id && self.log.writes.prior_version(entry.shard) == entry.version
                }
            };
            if !valid {
                return Err(AbortReason::ValidationFailed.into());
            }
        }
        Ok(())
    }

    /// Publish the attempt
    ///
    /// Returns the commit version, or `None` for a read-only transaction.
    /// On error the attempt is still active and must be rolled back.
    pub(crate) fn commit(&mut self) -> TxResult<Option<u64>> {
        debug_assert_eq!(self.status, TransactionStatus::Active);
        let manager = self.manager;
        let arena = manager.arena();

        if self.log.writes.is_empty() {
            if manager.config().validate_read_only {
                self.validate()?;
            }
            self.scoped.on_commit(arena);
            self.finish(TransactionStatus::Committed);
            return Ok(None);
        }

        self.validate()?;
        let version = manager.allocate_version();
        fence(Ordering::Release);

        let table = manager.table();
        for &shard in self.log.writes.owned_shards() {
            for entry in self.log.writes.bucket(shard) {
                arena.publish(entry.addr, entry.value);
            }
            table.release(shard, version);
        }

        self.scoped.on_commit(arena);
        self.finish(TransactionStatus::Committed);
        Ok(Some(version))
    }

    /// Undo the attempt: hand back owned shards, drop pending writes and
    /// release the attempt's allocations
    pub(crate) fn rollback(&mut self) {
        if self.status != TransactionStatus::Active {
            return;
        }
        let manager = self.manager;
        for &shard in self.log.writes.owned_shards() {
            manager
                .table()
                .restore(shard, self.log.writes.prior_version(shard));
        }
        self.scoped.on_abort(manager.arena());
        self.finish(TransactionStatus::Aborted);
    }

    fn finish(&mut self, status: TransactionStatus) {
        self.log.clear();
        self.status = status;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("thread", &self.id)
            .field("status", &self.status)
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}
