//! Transaction engine for shardstm
//!
//! This crate implements the sharded, versioned-clock transaction protocol:
//! - TransactionLog: per-thread read-set and shard-bucketed write-set
//! - Transaction: load/store/alloc/free with eager shard ownership
//! - TransactionManager: shared table, clock, arena and counters
//! - ThreadContext: retry loop, per-thread stats

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod context;
pub mod log;
pub mod manager;
pub mod stats;
pub mod transaction;

pub use allocator::ScopedAllocator;
pub use context::ThreadContext;
pub use log::{ReadEntry, ReadSet, TransactionLog, WriteEntry, WriteSet};
pub use manager::TransactionManager;
pub use stats::{GlobalStats, StmStats, ThreadStats};
pub use transaction::{Transaction, TransactionStatus};
