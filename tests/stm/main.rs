//! STM Integration Test Suite
//!
//! End-to-end tests through the public `shardstm` API: several OS threads,
//! each with its own `ThreadContext`, running transactions against one
//! runtime.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test --test stm
//!
//! # Run the contention tests only
//! cargo test --test stm isolation::
//! ```

use shardstm::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

pub mod config;
pub mod isolation;
pub mod scenarios;
pub mod stats;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Install a test-friendly tracing subscriber (idempotent)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Runtime with room for most tests
pub fn create_stm() -> Stm {
    init_tracing();
    Stm::builder()
        .shard_count(1024)
        .arena_words(1 << 14)
        .open()
        .expect("Failed to open runtime")
}

/// Runtime with a custom shard count, to force shard sharing
pub fn create_stm_with_shards(shards: usize) -> Stm {
    init_tracing();
    Stm::builder()
        .shard_count(shards)
        .arena_words(1 << 12)
        .open()
        .expect("Failed to open runtime")
}

/// Run `work` on `threads` OS threads released together by a barrier
///
/// Each thread gets its index and a fresh `ThreadContext`; the contexts are
/// stopped before the thread exits so their counters reach the runtime.
/// Returns whatever each thread returned, in index order.
pub fn run_concurrently<F, R>(stm: &Stm, threads: usize, work: F) -> Vec<R>
where
    F: Fn(usize, &mut ThreadContext) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let stm = stm.clone();
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut ctx = stm.thread().expect("Failed to register thread");
                barrier.wait();
                let out = work(i, &mut ctx);
                ctx.stop();
                out
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect()
}

/// Increment the word at `addr` in its own transaction
pub fn increment(ctx: &mut ThreadContext, addr: Addr) -> shardstm::Result<()> {
    ctx.transaction(|tx| {
        let n = tx.load(addr)?;
        tx.store(addr, n + 1)
    })?;
    Ok(())
}
