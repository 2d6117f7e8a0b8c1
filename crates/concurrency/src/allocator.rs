//! Scoped allocation for transactions
//!
//! Allocations and frees made inside a transaction only take effect once the
//! attempt's fate is known:
//!
//! | Event  | Recorded allocations | Pending frees |
//! |--------|----------------------|---------------|
//! | abort  | released             | discarded     |
//! | commit | kept (now live)      | released      |
//!
//! Both buffers have a fixed capacity. Running out is a programming error and
//! is reported as a fatal [`StmError`], never retried.

use shardstm_core::error::{Result, StmError};
use shardstm_core::types::Addr;
use shardstm_storage::Arena;

/// Per-thread allocation and free buffers
#[derive(Debug)]
pub struct ScopedAllocator {
    allocs: Vec<Addr>,
    frees: Vec<Addr>,
    max_allocs: usize,
    max_frees: usize,
}

impl ScopedAllocator {
    /// Create buffers holding at most `max_allocs` allocations and
    /// `max_frees` frees per attempt
    pub fn new(max_allocs: usize, max_frees: usize) -> Self {
        Self {
            allocs: Vec::with_capacity(max_allocs.min(64)),
            frees: Vec::with_capacity(max_frees.min(64)),
            max_allocs,
            max_frees,
        }
    }

    /// Fail unless another allocation can be recorded
    pub fn ensure_alloc_capacity(&self) -> Result<()> {
        if self.allocs.len() >= self.max_allocs {
            return Err(StmError::AllocCapacityExceeded {
                limit: self.max_allocs,
            });
        }
        Ok(())
    }

    /// Fail unless another free can be recorded
    pub fn ensure_free_capacity(&self) -> Result<()> {
        if self.frees.len() >= self.max_frees {
            return Err(StmError::FreeCapacityExceeded {
                limit: self.max_frees,
            });
        }
        Ok(())
    }

    /// Fail unless `addr` can be freed by the current attempt
    ///
    /// The address must start a live block and must not already be pending.
    pub fn check_free(&self, arena: &Arena, addr: Addr) -> Result<()> {
        self.ensure_free_capacity()?;
        if self.frees.contains(&addr) || !arena.is_block_start(addr) {
            return Err(StmError::InvalidFree(addr));
        }
        Ok(())
    }

    /// Remember a block allocated by the current attempt
    pub fn record_alloc(&mut self, addr: Addr) -> Result<()> {
        self.ensure_alloc_capacity()?;
        self.allocs.push(addr);
        Ok(())
    }

    /// Remember a block the current attempt wants freed at commit
    pub fn record_free(&mut self, addr: Addr) -> Result<()> {
        self.ensure_free_capacity()?;
        if self.frees.contains(&addr) {
            return Err(StmError::InvalidFree(addr));
        }
        self.frees.push(addr);
        Ok(())
    }

    /// Blocks allocated by the current attempt
    pub fn pending_allocs(&self) -> &[Addr] {
        &self.allocs
    }

    /// Blocks the current attempt will free on commit
    pub fn pending_frees(&self) -> &[Addr] {
        &self.frees
    }

    /// The attempt aborted: its allocations were never visible, release them
    ///
    /// Returns the number of blocks released.
    pub fn on_abort(&mut self, arena: &Arena) -> usize {
        let released = release_all(arena, &self.allocs);
        self.allocs.clear();
        self.frees.clear();
        released
    }

    /// The attempt committed: perform its frees, keep its allocations
    ///
    /// Returns the number of blocks released.
    pub fn on_commit(&mut self, arena: &Arena) -> usize {
        let released = release_all(arena, &self.frees);
        self.frees.clear();
        self.allocs.clear();
        released
    }
}

fn release_all(arena: &Arena, blocks: &[Addr]) -> usize {
    let mut released = 0;
    for &addr in blocks {
        match arena.release(addr) {
            Ok(_) => released += 1,
            // Two committed transactions freed the same block. The commit
            // already happened.
            Err(e) => tracing::error!(addr = %addr, error = %e, "scoped release failed"),
        }
    }
    released
}
