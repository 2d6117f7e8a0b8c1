//! Address to shard mapping

use shardstm_core::types::{Addr, WORD_SIZE};

/// Maps arena addresses onto ownership shards
///
/// The byte address is divided by the word size and reduced modulo the shard
/// count, so neighbouring words land on neighbouring shards and the same word
/// always lands on the same shard. Power-of-two shard counts use a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressHasher {
    shards: usize,
    mask: Option<usize>,
}

impl AddressHasher {
    /// Create a hasher for `shards` buckets
    ///
    /// `shards` must be non-zero; the runtime configuration enforces it.
    pub fn new(shards: usize) -> Self {
        debug_assert!(shards > 0);
        let mask = shards.is_power_of_two().then(|| shards - 1);
        Self { shards, mask }
    }

    /// Number of shards addresses are spread across
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Shard index of `addr`, in `[0, shard_count)`
    #[inline]
    pub fn hash(&self, addr: Addr) -> usize {
        let word = addr.byte_offset() / WORD_SIZE;
        match self.mask {
            Some(mask) => word & mask,
            None => word % self.shards,
        }
    }
}
