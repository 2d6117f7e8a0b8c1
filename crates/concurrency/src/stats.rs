//! Commit and abort counters
//!
//! Each thread counts into a private [`ThreadStats`]. When the thread stops,
//! its counters are folded into the runtime-wide [`GlobalStats`] with atomic
//! adds. [`StmStats`] is a plain snapshot of the aggregate.

use shardstm_core::error::AbortReason;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by one thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    /// Committed transactions
    pub commits: u64,
    /// Aborted attempts, all reasons
    pub aborts: u64,
    /// Aborted attempts, indexed by [`AbortReason::kind_index`]
    pub aborts_by_reason: [u64; AbortReason::KINDS],
    /// Transactions given up on (fatal error, retry budget, single attempt)
    pub abandoned: u64,
}

impl ThreadStats {
    /// Count a commit
    #[inline]
    pub fn record_commit(&mut self) {
        self.commits += 1;
    }

    /// Count an aborted attempt
    #[inline]
    pub fn record_abort(&mut self, reason: AbortReason) {
        self.aborts += 1;
        self.aborts_by_reason[reason.kind_index()] += 1;
    }

    /// Count an abandoned transaction
    #[inline]
    pub fn record_abandoned(&mut self) {
        self.abandoned += 1;
    }

    /// Aborts recorded for the kind of `reason`
    pub fn aborts_for(&self, reason: AbortReason) -> u64 {
        self.aborts_by_reason[reason.kind_index()]
    }
}

/// Aggregate counters shared by every thread of a runtime
#[derive(Debug, Default)]
pub struct GlobalStats {
    commits: AtomicU64,
    aborts: AtomicU64,
    aborts_by_reason: [AtomicU64; AbortReason::KINDS],
    abandoned: AtomicU64,
    threads: AtomicU64,
}

impl GlobalStats {
    /// Add one stopped thread's counters
    pub fn fold(&self, local: &ThreadStats) {
        self.commits.fetch_add(local.commits, Ordering::Relaxed);
        self.aborts.fetch_add(local.aborts, Ordering::Relaxed);
        for (total, &count) in self.aborts_by_reason.iter().zip(&local.aborts_by_reason) {
            total.fetch_add(count, Ordering::Relaxed);
        }
        self.abandoned.fetch_add(local.abandoned, Ordering::Relaxed);
        self.threads.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current totals
    pub fn snapshot(&self) -> StmStats {
        let mut aborts_by_reason = [0; AbortReason::KINDS];
        for (out, total) in aborts_by_reason.iter_mut().zip(&self.aborts_by_reason) {
            *out = total.load(Ordering::Relaxed);
        }
        StmStats {
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            aborts_by_reason,
            abandoned: self.abandoned.load(Ordering::Relaxed),
            threads: self.threads.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the aggregate counters
///
/// Only threads that have stopped are included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StmStats {
    /// Committed transactions
    pub commits: u64,
    /// Aborted attempts
    pub aborts: u64,
    /// Aborted attempts, indexed by [`AbortReason::kind_index`]
    pub aborts_by_reason: [u64; AbortReason::KINDS],
    /// Abandoned transactions
    pub abandoned: u64,
    /// Threads folded into the totals
    pub threads: u64,
}

impl StmStats {
    /// Aborts recorded for the kind of `reason`
    pub fn aborts_for(&self, reason: AbortReason) -> u64 {
        self.aborts_by_reason[reason.kind_index()]
    }

    /// Fraction of attempts that aborted, in `[0, 1]`
    pub fn abort_ratio(&self) -> f64 {
        let attempts = self.commits + self.aborts;
        if attempts == 0 {
            0.0
        } else {
            self.aborts as f64 / attempts as f64
        }
    }

    /// Throughput report over `elapsed_secs` seconds
    ///
    /// ```
    /// use shardstm_concurrency::StmStats;
    ///
    /// let stats = StmStats { commits: 500, aborts: 20, ..Default::default() };
    /// assert_eq!(
    ///     stats.render(2.0),
    ///     "# Commits: 500        - 250 /s\n# Aborts : 20         - 10 /s\n",
    /// );
    /// ```
    pub fn render(&self, elapsed_secs: f64) -> String {
        let rate = |count: u64| {
            if elapsed_secs > 0.0 {
                count as f64 / elapsed_secs
            } else {
                0.0
            }
        };
        format!(
            "# Commits: {:<10} - {:.0} /s\n# Aborts : {:<10} - {:.0} /s\n",
            self.commits,
            rate(self.commits),
            self.aborts,
            rate(self.aborts),
        )
    }
}
