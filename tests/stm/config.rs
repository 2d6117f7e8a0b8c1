//! Configuration Tests
//!
//! Tests for TOML loading, validation and retry budgets.

use crate::*;

#[test]
fn test_toml_config_applied() {
    let stm = Stm::builder()
        .toml(
            r#"
            shard_count = 512
            arena_words = 2048
            max_allocs_per_tx = 8
            max_retries = 3
            yield_on_conflict = false
            "#,
        )
        .unwrap()
        .open()
        .unwrap();

    let config = stm.config();
    assert_eq!(config.shard_count, 512);
    assert_eq!(config.arena_words, 2048);
    assert_eq!(config.max_allocs_per_tx, 8);
    assert_eq!(config.max_frees_per_tx, 1024);
    assert_eq!(config.max_retries, Some(3));
    assert!(!config.validate_read_only);
    assert!(!config.yield_on_conflict);
}

#[test]
fn test_toml_unknown_field_rejected() {
    let err = Stm::builder().toml("shards = 12").unwrap_err();
    assert!(matches!(err, shardstm::Error::InvalidConfig(_)));
}

#[test]
fn test_toml_zero_arena_rejected() {
    let err = Stm::builder().toml("arena_words = 0").unwrap_err();
    assert!(matches!(err, shardstm::Error::InvalidConfig(_)));
}

#[test]
fn test_non_power_of_two_shards() {
    let stm = create_stm_with_shards(7);
    let counter = Addr::new(13);

    run_concurrently(&stm, 3, move |_, ctx| {
        for _ in 0..200 {
            increment(ctx, counter).unwrap();
        }
    });
    assert_eq!(stm.peek(counter).unwrap(), 600);
}

#[test]
fn test_retry_budget_surfaces_error() {
    init_tracing();
    let stm = Stm::builder()
        .shard_count(16)
        .arena_words(64)
        .max_retries(0)
        .open()
        .unwrap();
    let mut ctx = stm.thread().unwrap();

    let err: shardstm::Error = ctx
        .transaction(|tx| -> TxResult<()> { Err(tx.abort(21)) })
        .unwrap_err()
        .into();

    assert!(err.is_retryable());
    assert_eq!(err.abort_reason(), Some(AbortReason::Explicit(21)));
    match err {
        shardstm::Error::RetryLimitExceeded { attempts, .. } => assert_eq!(attempts, 1),
        other => panic!("expected RetryLimitExceeded, got {:?}", other),
    }
}

#[test]
fn test_unbounded_retries_override() {
    let stm = Stm::builder()
        .max_retries(1)
        .unbounded_retries()
        .arena_words(16)
        .open()
        .unwrap();
    assert_eq!(stm.config().max_retries, None);
}
