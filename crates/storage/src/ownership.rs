//! Versioned ownership table
//!
//! One slot per shard. A slot is a single atomic word:
//!
//! ```text
//!  63                                    1   0
//! ┌─────────────────────────────────────────┬───┐
//! │ version        (owned = 0)              │ 0 │
//! │ owner thread   (owned = 1)              │ 1 │
//! └─────────────────────────────────────────┴───┘
//! ```
//!
//! Slots only change through compare-and-swap (acquire) or through a store
//! by the current owner (release, restore). A reader that saw a free slot,
//! read the protected word, and then saw the same slot again has read a value
//! that no commit overlapped.

use crate::hasher::AddressHasher;
use shardstm_core::types::{Addr, ThreadId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Decoded ownership slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody holds the shard; `version` is the last commit stamped into it
    Free {
        /// Version of the last commit that wrote through this shard
        version: u64,
    },
    /// A transaction holds the shard
    Owned {
        /// Thread holding the shard
        owner: ThreadId,
    },
}

/// Raw slot word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(u64);

impl Slot {
    const OWNED: u64 = 1;

    /// Slot for a free shard at `version`
    #[inline]
    pub const fn free(version: u64) -> Self {
        Slot(version << 1)
    }

    /// Slot for a shard owned by `owner`
    #[inline]
    pub const fn owned(owner: ThreadId) -> Self {
        Slot(((owner.get() as u64) << 1) | Self::OWNED)
    }

    /// Decode the slot
    #[inline]
    pub fn state(self) -> SlotState {
        if self.is_owned() {
            SlotState::Owned {
                owner: ThreadId::new((self.0 >> 1) as usize),
            }
        } else {
            SlotState::Free {
                version: self.0 >> 1,
            }
        }
    }

    /// Check the owned flag
    #[inline]
    pub fn is_owned(self) -> bool {
        self.0 & Self::OWNED != 0
    }

    /// Raw encoded word
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Global table of ownership slots, one per shard
pub struct OwnershipTable {
    slots: Box<[AtomicU64]>,
    hasher: AddressHasher,
}

impl OwnershipTable {
    /// Create a table with every shard free at version 0
    pub fn new(shard_count: usize) -> Self {
        let slots = (0..shard_count)
            .map(|_| AtomicU64::new(Slot::free(0).raw()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            hasher: AddressHasher::new(shard_count),
        }
    }

    /// Number of shards
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.slots.len()
    }

    /// Shard responsible for `addr`
    #[inline]
    pub fn shard_of(&self, addr: Addr) -> usize {
        self.hasher.hash(addr)
    }

    /// Read a slot
    ///
    /// Acquire pairs with the Release of [`release`](Self::release): a reader
    /// that sees a version also sees the words written before it.
    #[inline]
    pub fn read(&self, shard: usize) -> Slot {
        Slot(self.slots[shard].load(Ordering::Acquire))
    }

    /// Re-read a slot after an Acquire fence
    ///
    /// Used for the second read of the seqlock check; the caller has already
    /// fenced.
    #[inline]
    pub fn reread(&self, shard: usize) -> Slot {
        Slot(self.slots[shard].load(Ordering::Relaxed))
    }

    /// Try to take ownership of a free shard
    ///
    /// Succeeds only if the slot still holds `expected`. On failure returns
    /// the slot that is there now, which is either another free version (a
    /// commit slipped in) or an owner.
    #[inline]
    pub fn try_acquire(&self, shard: usize, expected: Slot, owner: ThreadId) -> Result<(), Slot> {
        debug_assert!(!expected.is_owned());
        self.slots[shard]
            .compare_exchange(
                expected.raw(),
                Slot::owned(owner).raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(Slot)
    }

    /// Publish a commit: mark the shard free at `version`
    ///
    /// Only the owner may call this, after every pending word of the shard
    /// has been written.
    #[inline]
    pub fn release(&self, shard: usize, version: u64) {
        debug_assert!(self.read(shard).is_owned());
        self.slots[shard].store(Slot::free(version).raw(), Ordering::Release);
    }

    /// Hand back a shard that an aborted attempt acquired but never wrote
    ///
    /// The slot returns to the version it had before acquisition; memory under
    /// it is unchanged, so readers that observed that version stay valid.
    #[inline]
    pub fn restore(&self, shard: usize, prior_version: u64) {
        debug_assert!(self.read(shard).is_owned());
        self.slots[shard].store(Slot::free(prior_version).raw(), Ordering::Release);
    }

    /// Number of shards currently owned by some transaction
    pub fn owned_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| Slot(slot.load(Ordering::Relaxed)).is_owned())
            .count()
    }
}

impl std::fmt::Debug for OwnershipTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipTable")
            .field("shard_count", &self.shard_count())
            .field("owned", &self.owned_count())
            .finish()
    }
}
