//! Runtime entry point for shardstm.
//!
//! This module provides [`Stm`], the handle every thread uses to reach the
//! shared transactional memory.

use crate::error::{Error, Result};
use shardstm_concurrency::{StmStats, ThreadContext, TransactionManager};
use shardstm_core::{Addr, StmConfig, Word};
use std::sync::Arc;
use tracing::info;

/// A transactional memory runtime.
///
/// Create one with [`Stm::open`] or [`Stm::builder`], then give each OS
/// thread its own [`ThreadContext`] through [`Stm::thread`]. The handle is
/// cheap to clone; every clone refers to the same memory.
///
/// # Example
///
/// ```
/// use shardstm::prelude::*;
///
/// let stm = Stm::builder().shard_count(64).arena_words(1024).open()?;
/// let counter = stm.alloc(1)?;
///
/// let mut ctx = stm.thread()?;
/// ctx.transaction(|tx| {
///     let n = tx.load(counter)?;
///     tx.store(counter, n + 1)
/// })?;
///
/// assert_eq!(stm.peek(counter)?, 1);
/// # Ok::<(), shardstm::Error>(())
/// ```
#[derive(Clone)]
pub struct Stm {
    inner: Arc<TransactionManager>,
}

impl Stm {
    /// Start a runtime with the given configuration.
    pub fn open(config: StmConfig) -> Result<Self> {
        let inner = Arc::new(TransactionManager::new(config)?);
        info!(
            shards = inner.config().shard_count,
            arena_words = inner.config().arena_words,
            "stm runtime started"
        );
        Ok(Stm { inner })
    }

    /// Create a builder for runtime configuration.
    ///
    /// # Example
    ///
    /// ```
    /// let stm = shardstm::Stm::builder()
    ///     .shard_count(1024)
    ///     .max_retries(50)
    ///     .open()?;
    /// # Ok::<(), shardstm::Error>(())
    /// ```
    pub fn builder() -> StmBuilder {
        StmBuilder::new()
    }

    /// Configuration the runtime was started with.
    pub fn config(&self) -> &StmConfig {
        self.inner.config()
    }

    /// Register the calling thread.
    ///
    /// Each OS thread needs its own context; a context is not shared between
    /// threads. Fails after [`shutdown`](Self::shutdown).
    pub fn thread(&self) -> Result<ThreadContext> {
        ThreadContext::new(Arc::clone(&self.inner)).map_err(Error::from)
    }

    /// Allocate `words` zeroed words outside any transaction.
    ///
    /// Intended for setting up shared structures before threads start.
    pub fn alloc(&self, words: usize) -> Result<Addr> {
        self.inner.arena().allocate(words).map_err(Into::into)
    }

    /// Release a block allocated with [`alloc`](Self::alloc) or a committed
    /// transactional allocation.
    ///
    /// The caller must ensure no transaction still uses the block.
    pub fn release(&self, addr: Addr) -> Result<()> {
        self.inner.arena().release(addr)?;
        Ok(())
    }

    /// Write a word without going through a transaction.
    ///
    /// Only valid while no transaction can touch `addr`, e.g. during setup.
    pub fn init(&self, addr: Addr, value: Word) -> Result<()> {
        self.inner.arena().store(addr, value).map_err(Into::into)
    }

    /// Read the committed value of a word.
    ///
    /// The value is exact when no transaction is committing through the
    /// word's shard; use a transaction for a consistent view under load.
    pub fn peek(&self, addr: Addr) -> Result<Word> {
        self.inner.arena().load(addr).map_err(Into::into)
    }

    /// Current value of the global version clock.
    pub fn current_version(&self) -> u64 {
        self.inner.current_version()
    }

    /// Aggregate counters of every thread that has stopped.
    pub fn stats(&self) -> StmStats {
        self.inner.stats()
    }

    /// Print commit and abort throughput over `elapsed_secs` to stdout.
    pub fn print_stats(&self, elapsed_secs: f64) {
        print!("{}", self.stats().render(elapsed_secs));
    }

    /// Get runtime metrics.
    pub fn metrics(&self) -> StmMetrics {
        let stats = self.stats();
        let arena = self.inner.arena();
        StmMetrics {
            transactions_committed: stats.commits,
            transactions_aborted: stats.aborts,
            transactions_abandoned: stats.abandoned,
            abort_ratio: stats.abort_ratio(),
            clock: self.current_version(),
            shards_owned: self.inner.table().owned_count(),
            live_words: arena.live_words(),
            arena_words: arena.capacity(),
        }
    }

    /// Stop the runtime.
    ///
    /// Threads already registered keep working; new registrations fail.
    /// Returns the aggregate counters at the time of the call.
    pub fn shutdown(&self) -> StmStats {
        let stats = self.stats();
        if self.inner.stop() {
            info!(
                commits = stats.commits,
                aborts = stats.aborts,
                abandoned = stats.abandoned,
                clock = self.current_version(),
                "stm runtime stopped"
            );
        }
        stats
    }

    /// Check if [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_stopped()
    }
}

impl std::fmt::Debug for Stm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stm").field("inner", &self.inner).finish()
    }
}

/// Runtime metrics.
#[derive(Debug, Clone)]
pub struct StmMetrics {
    /// Total committed transactions
    pub transactions_committed: u64,
    /// Total aborted attempts
    pub transactions_aborted: u64,
    /// Transactions given up on
    pub transactions_abandoned: u64,
    /// Aborted attempts per attempt (0.0 - 1.0)
    pub abort_ratio: f64,
    /// Global version clock
    pub clock: u64,
    /// Shards owned by in-flight transactions
    pub shards_owned: usize,
    /// Arena words currently allocated
    pub live_words: usize,
    /// Arena capacity in words
    pub arena_words: usize,
}

/// Builder for runtime configuration.
///
/// # Example
///
/// ```
/// use shardstm::Stm;
///
/// // Small runtime for tests
/// let stm = Stm::builder()
///     .shard_count(16)
///     .arena_words(256)
///     .yield_on_conflict(false)
///     .open()?;
///
/// // From a TOML document
/// let stm = Stm::builder()
///     .toml("shard_count = 128\nvalidate_read_only = true")?
///     .open()?;
/// assert!(stm.config().validate_read_only);
/// # Ok::<(), shardstm::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StmBuilder {
    config: StmConfig,
}

impl StmBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: StmConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the configuration with one parsed from TOML.
    pub fn toml(mut self, input: &str) -> Result<Self> {
        self.config = StmConfig::from_toml_str(input)?;
        Ok(self)
    }

    /// Set the number of ownership shards.
    pub fn shard_count(mut self, shards: usize) -> Self {
        self.config.shard_count = shards;
        self
    }

    /// Set the arena capacity in words.
    pub fn arena_words(mut self, words: usize) -> Self {
        self.config.arena_words = words;
        self
    }

    /// Set the per-transaction allocation buffer capacity.
    pub fn max_allocs_per_tx(mut self, limit: usize) -> Self {
        self.config.max_allocs_per_tx = limit;
        self
    }

    /// Set the per-transaction pending-free buffer capacity.
    pub fn max_frees_per_tx(mut self, limit: usize) -> Self {
        self.config.max_frees_per_tx = limit;
        self
    }

    /// Give up after `retries` retries following the first attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = Some(retries);
        self
    }

    /// Retry until commit (default).
    pub fn unbounded_retries(mut self) -> Self {
        self.config.max_retries = None;
        self
    }

    /// Validate read-only transactions at commit.
    pub fn validate_read_only(mut self, enabled: bool) -> Self {
        self.config.validate_read_only = enabled;
        self
    }

    /// Yield the OS thread after contention aborts.
    pub fn yield_on_conflict(mut self, enabled: bool) -> Self {
        self.config.yield_on_conflict = enabled;
        self
    }

    /// Start the runtime.
    pub fn open(self) -> Result<Stm> {
        Stm::open(self.config)
    }
}
