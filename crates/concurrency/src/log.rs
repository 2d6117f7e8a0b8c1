//! Per-thread transaction log
//!
//! - [`ReadSet`]: append-only record of (address, shard, version) observations
//! - [`WriteSet`]: one bucket of pending (address, value) edits per shard,
//!   plus the shards this attempt owns and the version each had when acquired
//!
//! Both are owned by a single thread and reused across attempts; clearing
//! keeps their capacity.

use shardstm_core::types::{Addr, Word};
use smallvec::SmallVec;

/// One observation recorded by a transactional load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEntry {
    /// Address read
    pub addr: Addr,
    /// Shard the address hashes to
    pub shard: usize,
    /// Shard version seen when the word was read
    pub version: u64,
}

/// Addresses read by the current attempt
#[derive(Debug, Default)]
pub struct ReadSet {
    entries: Vec<ReadEntry>,
}

impl ReadSet {
    /// Create an empty read-set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation
    #[inline]
    pub fn push(&mut self, entry: ReadEntry) {
        self.entries.push(entry);
    }

    /// Observations in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = &ReadEntry> {
        self.entries.iter()
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was read
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every observation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A pending store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEntry {
    /// Target address
    pub addr: Addr,
    /// Value to publish at commit
    pub value: Word,
}

#[derive(Debug, Default)]
struct Bucket {
    entries: SmallVec<[WriteEntry; 1]>,
    prior_version: u64,
}

/// Pending stores, bucketed by shard
#[derive(Debug)]
pub struct WriteSet {
    buckets: Vec<Bucket>,
    owned: Vec<usize>,
    len: usize,
}

impl WriteSet {
    /// Create a write-set with one bucket per shard
    pub fn new(shard_count: usize) -> Self {
        let mut buckets = Vec::with_capacity(shard_count);
        buckets.resize_with(shard_count, Bucket::default);
        Self {
            buckets,
            owned: Vec::new(),
            len: 0,
        }
    }

    /// Pending value for `addr`, if this attempt stored to it
    #[inline]
    pub fn lookup(&self, shard: usize, addr: Addr) -> Option<Word> {
        self.buckets[shard]
            .entries
            .iter()
            .find(|entry| entry.addr == addr)
            .map(|entry| entry.value)
    }

    /// Record ownership of `shard`, acquired from a free slot at `prior_version`
    pub fn take_ownership(&mut self, shard: usize, prior_version: u64) {
        debug_assert!(!self.owned.contains(&shard));
        self.buckets[shard].prior_version = prior_version;
        self.owned.push(shard);
    }

    /// Version `shard` had before this attempt acquired it
    ///
    /// Only meaningful for shards listed in [`owned_shards`](Self::owned_shards).
    #[inline]
    pub fn prior_version(&self, shard: usize) -> u64 {
        self.buckets[shard].prior_version
    }

    /// Insert a pending store, or overwrite the one already there for `addr`
    pub fn upsert(&mut self, shard: usize, addr: Addr, value: Word) {
        let bucket = &mut self.buckets[shard];
        match bucket.entries.iter_mut().find(|entry| entry.addr == addr) {
            Some(entry) => entry.value = value,
            None => {
                bucket.entries.push(WriteEntry { addr, value });
                self.len += 1;
            }
        }
    }

    /// Shards owned by this attempt, in acquisition order
    pub fn owned_shards(&self) -> &[usize] {
        &self.owned
    }

    /// Pending stores for one shard
    pub fn bucket(&self, shard: usize) -> &[WriteEntry] {
        &self.buckets[shard].entries
    }

    /// Number of distinct addresses stored to
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the attempt has not stored anything
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    /// Drop every pending store; only touched buckets are visited
    pub fn clear(&mut self) {
        for &shard in &self.owned {
            self.buckets[shard].entries.clear();
        }
        self.owned.clear();
        self.len = 0;
    }
}

/// Read-set and write-set of one thread
#[derive(Debug)]
pub struct TransactionLog {
    /// Observations made by loads
    pub reads: ReadSet,
    /// Pending stores and owned shards
    pub writes: WriteSet,
}

impl TransactionLog {
    /// Create an empty log sized for `shard_count` shards
    pub fn new(shard_count: usize) -> Self {
        Self {
            reads: ReadSet::new(),
            writes: WriteSet::new(shard_count),
        }
    }

    /// Reset both sets for the next attempt
    pub fn clear(&mut self) {
        self.reads.clear();
        self.writes.clear();
    }
}
