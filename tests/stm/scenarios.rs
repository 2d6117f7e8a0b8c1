//! Reference Scenarios
//!
//! - A: single-thread store then load
//! - B: two threads incrementing one counter
//! - C: store into a shard another thread holds
//! - D: allocation under abort and commit

use crate::*;
use std::sync::mpsc;

#[test]
fn test_scenario_a_store_then_load() {
    let stm = create_stm();
    let x = stm.alloc(1).unwrap();
    let mut ctx = stm.thread().unwrap();

    ctx.transaction(|tx| tx.store(x, 5)).unwrap();
    let v = ctx.transaction(|tx| tx.load(x)).unwrap();

    assert_eq!(v, 5);
    assert_eq!(ctx.stats().commits, 2);
    assert_eq!(ctx.stats().aborts, 0);
}

#[test]
fn test_scenario_b_shared_counter() {
    const THREADS: usize = 2;
    const INCREMENTS: usize = 1000;

    let stm = create_stm();
    let counter = stm.alloc(1).unwrap();

    let commits = run_concurrently(&stm, THREADS, move |_, ctx| {
        for _ in 0..INCREMENTS {
            increment(ctx, counter).unwrap();
        }
        ctx.stats().commits
    });

    assert_eq!(stm.peek(counter).unwrap(), THREADS * INCREMENTS);
    assert_eq!(commits.iter().sum::<u64>(), (THREADS * INCREMENTS) as u64);

    let stats = stm.stats();
    assert_eq!(stats.commits, (THREADS * INCREMENTS) as u64);
    assert_eq!(stats.threads, THREADS as u64);
}

#[test]
fn test_scenario_c_lock_held_by_another_transaction() {
    let stm = create_stm_with_shards(8);
    let a_addr = Addr::new(3);
    // Same shard as a_addr with 8 shards.
    let b_addr = Addr::new(11);

    let (held_tx, held_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let holder = {
        let stm = stm.clone();
        thread::spawn(move || {
            let mut ctx = stm.thread().unwrap();
            ctx.try_transaction(|tx| {
                tx.store(a_addr, 1)?;
                held_tx.send(()).unwrap();
                done_rx.recv().unwrap();
                Ok(())
            })
            .unwrap();
        })
    };

    held_rx.recv().unwrap();
    let mut ctx = stm.thread().unwrap();
    let err = ctx
        .try_transaction(|tx| tx.store(b_addr, 99))
        .unwrap_err();

    assert_eq!(err.abort_reason(), Some(AbortReason::LockHeld));
    assert_eq!(err.abort_reason().map(|r| r.code()), Some(1));
    assert_eq!(ctx.stats().aborts, 1);
    assert_eq!(ctx.last_abort_reason(), Some(AbortReason::LockHeld));

    done_tx.send(()).unwrap();
    holder.join().unwrap();

    assert_eq!(stm.peek(a_addr).unwrap(), 1);
    assert_eq!(stm.peek(b_addr).unwrap(), 0);

    // With the shard released, B's store goes through.
    ctx.transaction(|tx| tx.store(b_addr, 99)).unwrap();
    assert_eq!(stm.peek(b_addr).unwrap(), 99);
}

#[test]
fn test_scenario_d_alloc_released_on_abort() {
    let stm = create_stm();
    let mut ctx = stm.thread().unwrap();
    let live_before = stm.metrics().live_words;

    let err = ctx
        .try_transaction(|tx| -> TxResult<()> {
            let block = tx.alloc(16)?;
            tx.store(block, 7)?;
            Err(tx.abort(3))
        })
        .unwrap_err();
    assert_eq!(err.abort_reason(), Some(AbortReason::Explicit(3)));
    assert_eq!(stm.metrics().live_words, live_before);
}

#[test]
fn test_scenario_d_alloc_survives_commit() {
    let stm = create_stm();
    let mut ctx = stm.thread().unwrap();

    let block = ctx
        .transaction(|tx| {
            let block = tx.alloc(4)?;
            tx.store(block, 10)?;
            tx.store(block.offset(3), 13)?;
            Ok(block)
        })
        .unwrap();

    let (first, last) = ctx
        .transaction(|tx| Ok((tx.load(block)?, tx.load(block.offset(3))?)))
        .unwrap();
    assert_eq!((first, last), (10, 13));

    // Visible to another thread as well.
    let seen = run_concurrently(&stm, 1, move |_, ctx| {
        ctx.transaction(|tx| tx.load(block)).unwrap()
    });
    assert_eq!(seen, vec![10]);
}
