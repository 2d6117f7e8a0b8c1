//! Shared word arena
//!
//! Transactional memory lives here instead of behind raw pointers. The arena
//! is a fixed array of atomic words addressed by [`Addr`], plus a block
//! allocator for `alloc`/`free`.
//!
//! # Design
//!
//! - Words: `Box<[AtomicUsize]>`, never resized, so a validated address stays
//!   valid for the lifetime of the arena
//! - Free list: `BTreeMap<start, len>`, first-fit, coalesced on release
//! - Live blocks: `FxHashMap<start, len>`, so a release knows its length
//!
//! Only allocation and release take the allocator lock. Loads, stores and
//! commits touch the words directly.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use shardstm_core::error::{Result, StmError};
use shardstm_core::types::{Addr, Word};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Blocks {
    free: BTreeMap<usize, usize>,
    live: FxHashMap<usize, usize>,
    live_words: usize,
}

impl Blocks {
    fn new(capacity: usize) -> Self {
        let mut free = BTreeMap::new();
        free.insert(0, capacity);
        Self {
            free,
            live: FxHashMap::default(),
            live_words: 0,
        }
    }

    fn largest_free(&self) -> usize {
        self.free.values().copied().max().unwrap_or(0)
    }

    fn take(&mut self, words: usize) -> Option<usize> {
        let (&start, &len) = self.free.iter().find(|(_, len)| **len >= words)?;
        self.free.remove(&start);
        if len > words {
            self.free.insert(start + words, len - words);
        }
        self.live.insert(start, words);
        self.live_words += words;
        Some(start)
    }

    fn give_back(&mut self, start: usize) -> Option<usize> {
        let words = self.live.remove(&start)?;
        self.live_words -= words;

        let mut begin = start;
        let mut len = words;

        // Merge with the block ending where this one starts.
        if let Some((&prev_start, &prev_len)) = self.free.range(..start).next_back() {
            if prev_start + prev_len == start {
                self.free.remove(&prev_start);
                begin = prev_start;
                len += prev_len;
            }
        }
        // Merge with the block starting where this one ends.
        if let Some(next_len) = self.free.remove(&(start + words)) {
            len += next_len;
        }
        self.free.insert(begin, len);
        Some(words)
    }
}

/// Fixed-capacity array of transactional words with a block allocator
pub struct Arena {
    words: Box<[AtomicUsize]>,
    blocks: Mutex<Blocks>,
}

impl Arena {
    /// Create an arena of `capacity` zeroed words, all free
    pub fn new(capacity: usize) -> Self {
        let words = (0..capacity)
            .map(|_| AtomicUsize::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            words,
            blocks: Mutex::new(Blocks::new(capacity)),
        }
    }

    /// Capacity in words
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Word cell at `addr`, or `InvalidAddress` if outside the arena
    #[inline]
    pub fn word(&self, addr: Addr) -> Result<&AtomicUsize> {
        self.words
            .get(addr.index())
            .ok_or(StmError::InvalidAddress {
                addr,
                capacity: self.capacity(),
            })
    }

    /// Write a word whose address was validated when it entered a write-set
    ///
    /// The arena never shrinks, so a validated address cannot go stale.
    #[inline]
    pub fn publish(&self, addr: Addr, value: Word) {
        self.words[addr.index()].store(value, Ordering::Relaxed);
    }

    /// Plain load outside the transaction protocol
    pub fn load(&self, addr: Addr) -> Result<Word> {
        Ok(self.word(addr)?.load(Ordering::Acquire))
    }

    /// Plain store outside the transaction protocol
    ///
    /// Only for initialising words no transaction can observe yet.
    pub fn store(&self, addr: Addr, value: Word) -> Result<()> {
        self.word(addr)?.store(value, Ordering::Release);
        Ok(())
    }

    /// Allocate `words` contiguous zeroed words
    pub fn allocate(&self, words: usize) -> Result<Addr> {
        if words == 0 {
            return Err(StmError::ZeroSizedAlloc);
        }
        let start = {
            let mut blocks = self.blocks.lock();
            match blocks.take(words) {
                Some(start) => start,
                None => {
                    return Err(StmError::OutOfMemory {
                        requested: words,
                        available: blocks.largest_free(),
                    })
                }
            }
        };
        for word in &self.words[start..start + words] {
            word.store(0, Ordering::Relaxed);
        }
        Ok(Addr::new(start))
    }

    /// Release the block starting at `addr`, returning its length in words
    pub fn release(&self, addr: Addr) -> Result<usize> {
        self.blocks
            .lock()
            .give_back(addr.index())
            .ok_or(StmError::InvalidFree(addr))
    }

    /// Check whether `addr` is the first word of a live block
    pub fn is_block_start(&self, addr: Addr) -> bool {
        self.blocks.lock().live.contains_key(&addr.index())
    }

    /// Words currently handed out
    pub fn live_words(&self) -> usize {
        self.blocks.lock().live_words
    }

    /// Number of live blocks
    pub fn live_blocks(&self) -> usize {
        self.blocks.lock().live.len()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("live_words", &self.live_words())
            .field("live_blocks", &self.live_blocks())
            .finish()
    }
}
