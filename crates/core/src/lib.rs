//! Core types for shardstm
//!
//! This crate holds what every other layer agrees on:
//! - Addressing: [`Addr`], [`Word`], [`ThreadId`]
//! - Errors: [`AbortReason`], [`TxError`], [`StmError`]
//! - Configuration: [`StmConfig`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::StmConfig;
pub use error::{AbortReason, Result, StmError, TxError, TxResult};
pub use types::{Addr, ThreadId, Word, WORD_SIZE};
