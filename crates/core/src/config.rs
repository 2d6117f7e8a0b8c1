//! Runtime configuration
//!
//! [`StmConfig`] is fixed when the runtime starts. It can be built in code,
//! through the facade's builder, or parsed from TOML:
//!
//! ```
//! use shardstm_core::config::StmConfig;
//!
//! let config = StmConfig::from_toml_str(r#"
//!     shard_count = 256
//!     arena_words = 65536
//!     max_retries = 100
//! "#).unwrap();
//! assert_eq!(config.shard_count, 256);
//! assert_eq!(config.max_allocs_per_tx, 1024);
//! ```

use crate::error::{Result, StmError};
use serde::Deserialize;

/// Default number of ownership shards
pub const DEFAULT_SHARD_COUNT: usize = 4096;

/// Default arena capacity in words
pub const DEFAULT_ARENA_WORDS: usize = 1 << 20;

/// Default capacity of the per-transaction allocation and free buffers
pub const DEFAULT_SCOPED_BUFFER: usize = 1024;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StmConfig {
    /// Number of ownership shards (`H`)
    ///
    /// Too few shards make unrelated addresses contend; too many waste memory
    /// in the table and in every thread's write-set index.
    pub shard_count: usize,

    /// Capacity of the shared arena in words
    pub arena_words: usize,

    /// Maximum `alloc` calls within one transaction attempt
    pub max_allocs_per_tx: usize,

    /// Maximum `free` calls within one transaction attempt
    pub max_frees_per_tx: usize,

    /// Retries allowed after the first attempt; `None` retries until commit
    pub max_retries: Option<u32>,

    /// Validate the read-set of read-only transactions at commit
    pub validate_read_only: bool,

    /// Yield the OS thread after an abort caused by shard contention
    pub yield_on_conflict: bool,
}

impl Default for StmConfig {
    fn default() -> Self {
        StmConfig {
            shard_count: DEFAULT_SHARD_COUNT,
            arena_words: DEFAULT_ARENA_WORDS,
            max_allocs_per_tx: DEFAULT_SCOPED_BUFFER,
            max_frees_per_tx: DEFAULT_SCOPED_BUFFER,
            max_retries: None,
            validate_read_only: false,
            yield_on_conflict: true,
        }
    }
}

impl StmConfig {
    /// Parse a configuration from TOML, then validate it
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: StmConfig =
            toml::from_str(input).map_err(|e| StmError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can back a runtime
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(StmError::InvalidConfig(
                "shard_count must be at least 1".to_string(),
            ));
        }
        if self.arena_words == 0 {
            return Err(StmError::InvalidConfig(
                "arena_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
