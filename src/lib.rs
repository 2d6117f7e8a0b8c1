//! # shardstm
//!
//! Word-based software transactional memory with sharded ownership and a
//! global version clock.
//!
//! Threads bracket a region of code as a transaction. Every word the region
//! reads or writes is tracked; on commit all writes become visible at once,
//! and on conflict the region is rolled back and run again.
//!
//! ## Quick Start
//!
//! ```
//! use shardstm::prelude::*;
//! use std::thread;
//!
//! let stm = Stm::builder().shard_count(256).arena_words(1 << 12).open()?;
//! let counter = stm.alloc(1)?;
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let stm = stm.clone();
//!         thread::spawn(move || -> shardstm::Result<()> {
//!             let mut ctx = stm.thread()?;
//!             for _ in 0..100 {
//!                 ctx.transaction(|tx| {
//!                     let n = tx.load(counter)?;
//!                     tx.store(counter, n + 1)
//!                 })?;
//!             }
//!             Ok(())
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap()?;
//! }
//!
//! assert_eq!(stm.peek(counter)?, 400);
//! # Ok::<(), shardstm::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`shardstm_core`] - addresses, errors, configuration
//! - [`shardstm_storage`] - address hashing, ownership table, word arena
//! - [`shardstm_concurrency`] - transaction engine and thread contexts
//!
//! ## Aborts
//!
//! Transactional operations return [`TxResult`]. Propagate errors with `?`;
//! [`ThreadContext::transaction`] catches conflict aborts and retries. The
//! body can abort on purpose with `return Err(tx.abort(code))`.

#![warn(missing_docs)]

mod error;
mod runtime;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use runtime::{Stm, StmBuilder, StmMetrics};

// Re-export the transaction engine
pub use shardstm_concurrency::{
    StmStats, ThreadContext, ThreadStats, Transaction, TransactionStatus,
};

// Re-export core types
pub use shardstm_core::{AbortReason, Addr, StmConfig, StmError, ThreadId, TxError, TxResult, Word};

pub use shardstm_concurrency;
pub use shardstm_core;
pub use shardstm_storage;
