//! Shared memory layer for shardstm
//!
//! This crate implements the state every thread shares:
//! - AddressHasher: address to shard mapping
//! - OwnershipTable: one versioned ownership slot per shard
//! - Arena: fixed array of atomic words with a block allocator

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod hasher;
pub mod ownership;

pub use arena::Arena;
pub use hasher::AddressHasher;
pub use ownership::{OwnershipTable, Slot, SlotState};
