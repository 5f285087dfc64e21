//! Configuration for hashchain
//!
//! Centralized configuration with sensible defaults.

use crate::error::{ChainError, Result};

/// Main configuration for a hash chain store
#[derive(Debug, Clone)]
pub struct ChainConfig {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Fixed size in bytes of every encoded message.
    /// Must stay the same for the lifetime of a store; the record size is
    /// derived from it and the digest size.
    pub message_size: usize,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to sync the store after appends
    pub sync_strategy: SyncStrategy,
}

/// Store sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave syncing to the caller (fastest)
    Never,

    /// Sync after every appended record (safest, slowest)
    EveryWrite,

    /// Sync after N appended records
    EveryNRecords { count: usize },
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            message_size: 64,
            sync_strategy: SyncStrategy::Never,
        }
    }
}

impl ChainConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config with the given message size and default everything else
    pub fn with_message_size(message_size: usize) -> Self {
        Self {
            message_size,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.message_size == 0 {
            return Err(ChainError::Config("message size must be non-zero".into()));
        }
        if let SyncStrategy::EveryNRecords { count: 0 } = self.sync_strategy {
            return Err(ChainError::Config("sync count must be non-zero".into()));
        }
        Ok(())
    }
}

/// Builder for ChainConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: ChainConfig,
}

impl ConfigBuilder {
    /// Set the fixed message size (in bytes)
    pub fn message_size(mut self, size: usize) -> Self {
        self.config.message_size = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<ChainConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
