//! Statistics Tests
//!
//! Tests for commit/abort accounting and the throughput report.

use crate::*;

#[test]
fn test_stats_only_include_stopped_threads() {
    let stm = create_stm();
    let x = stm.alloc(1).unwrap();

    let mut running = stm.thread().unwrap();
    increment(&mut running, x).unwrap();

    let mut stopped = stm.thread().unwrap();
    increment(&mut stopped, x).unwrap();
    increment(&mut stopped, x).unwrap();
    stopped.stop();

    assert_eq!(stm.stats().commits, 2);
    drop(running);
    assert_eq!(stm.stats().commits, 3);
    assert_eq!(stm.stats().threads, 2);
}

#[test]
fn test_abort_reasons_are_counted() {
    let stm = create_stm();
    let x = stm.alloc(1).unwrap();
    let mut ctx = stm.thread().unwrap();

    for code in [7u16, 7, 9] {
        let _ = ctx.try_transaction(|tx| -> TxResult<()> {
            tx.store(x, 1)?;
            Err(tx.abort(code))
        });
    }
    assert_eq!(ctx.last_abort_reason(), Some(AbortReason::Explicit(9)));

    let local = ctx.stop();
    assert_eq!(local.aborts, 3);
    assert_eq!(local.aborts_for(AbortReason::Explicit(0)), 3);
    assert_eq!(local.abandoned, 3);

    let global = stm.stats();
    assert_eq!(global.aborts, 3);
    assert_eq!(global.commits, 0);
    assert_eq!(global.aborts_by_reason.iter().sum::<u64>(), global.aborts);
}

#[test]
fn test_contention_aborts_sum_by_reason() {
    const THREADS: usize = 4;

    let stm = create_stm_with_shards(1);
    let counter = Addr::new(0);

    run_concurrently(&stm, THREADS, move |_, ctx| {
        for _ in 0..300 {
            increment(ctx, counter).unwrap();
        }
    });

    let stats = stm.stats();
    assert_eq!(stats.commits, (THREADS * 300) as u64);
    assert_eq!(stats.aborts_by_reason.iter().sum::<u64>(), stats.aborts);
    assert_eq!(stats.aborts_for(AbortReason::Explicit(0)), 0);
}

#[test]
fn test_render_report() {
    let stm = create_stm();
    let mut ctx = stm.thread().unwrap();
    for i in 0..4 {
        ctx.transaction(|tx| tx.store(Addr::new(i), i)).unwrap();
    }
    let _ = ctx.try_transaction(|tx| -> TxResult<()> { Err(tx.abort(1)) });
    ctx.stop();

    let report = stm.stats().render(4.0);
    assert_eq!(
        report,
        "# Commits: 4          - 1 /s\n# Aborts : 1          - 0 /s\n"
    );

    // Printing goes to stdout and must not disturb the counters.
    stm.print_stats(4.0);
    assert_eq!(stm.stats().commits, 4);
}

#[test]
fn test_shutdown_returns_final_stats() {
    let stm = create_stm();
    let mut ctx = stm.thread().unwrap();
    ctx.transaction(|tx| tx.store(Addr::new(0), 1)).unwrap();
    ctx.stop();

    let stats = stm.shutdown();
    assert_eq!(stats.commits, 1);
    assert!(matches!(stm.thread(), Err(shardstm::Error::Stopped)));
}
