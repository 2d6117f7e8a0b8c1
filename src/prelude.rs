//! Convenient imports for shardstm.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```
//! use shardstm::prelude::*;
//!
//! let stm = Stm::builder().arena_words(16).open()?;
//! let mut ctx = stm.thread()?;
//! ctx.transaction(|tx| tx.store(Addr::new(0), 1))?;
//! # Ok::<(), shardstm::Error>(())
//! ```

// Main entry point
pub use crate::runtime::{Stm, StmBuilder};

// Error handling
pub use crate::error::{Error, Result};
pub use shardstm_core::{AbortReason, TxError, TxResult};

// Transactions
pub use shardstm_concurrency::{ThreadContext, Transaction};

// Core types
pub use shardstm_core::{Addr, StmConfig, Word};
