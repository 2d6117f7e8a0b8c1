//! Core types for the transactional memory runtime
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Word`]: the unit of transactional memory
//! - [`Addr`]: a word-granular address into the shared arena
//! - [`ThreadId`]: identifier of a thread registered with the runtime

/// A transactional memory word
///
/// Every transactional load and store moves exactly one machine word.
pub type Word = usize;

/// Size of a [`Word`] in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Address of a word in the shared arena
///
/// Addresses are word indices, not language-level pointers. The byte address
/// of a word is `index * WORD_SIZE`; shard hashing divides it back down, so
/// two accesses to the same word always land on the same shard.
///
/// # Examples
///
/// ```
/// use shardstm_core::types::{Addr, WORD_SIZE};
///
/// let a = Addr::new(3);
/// assert_eq!(a.index(), 3);
/// assert_eq!(a.byte_offset(), 3 * WORD_SIZE);
/// assert_eq!(a.offset(2), Addr::new(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(usize);

impl Addr {
    /// Create an address from a word index
    pub const fn new(index: usize) -> Self {
        Addr(index)
    }

    /// Word index of this address
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Byte offset of this address from the start of the arena
    #[inline]
    pub const fn byte_offset(self) -> usize {
        self.0 * WORD_SIZE
    }

    /// Address `words` words past this one
    #[inline]
    pub const fn offset(self, words: usize) -> Self {
        Addr(self.0 + words)
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{:#x}", self.byte_offset())
    }
}

/// Identifier of a thread registered with the runtime
///
/// Thread ids are handed out once per registered thread and are encoded into
/// ownership slots while the thread holds a shard, so they must fit in a
/// word with one bit to spare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(usize);

impl ThreadId {
    /// Largest id that can be encoded into an ownership slot
    pub const MAX: usize = usize::MAX >> 1;

    /// Create a thread id
    pub const fn new(id: usize) -> Self {
        ThreadId(id)
    }

    /// Raw numeric id
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
