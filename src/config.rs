//! Configuration for lhkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::compress::CompressorId;
use crate::error::{LhkvError, Result};

/// Configuration used to open a table
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Table folder. Internal structure:
    ///   {data_dir}/
    ///     ├── parameters.json
    ///     ├── 0.idx / 0.arc / 0.tomb      (shallow buckets)
    ///     └── 12/ ...                     (byte fan-out for deep buckets)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Defaults for New Tables
    // -------------------------------------------------------------------------
    /// Records per bucket before the table grows by one bucket.
    /// Ignored when the table already exists.
    pub bucket_capacity: u32,

    /// Value compressor. Ignored when the table already exists.
    pub compressor: CompressorId,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// A bucket is compacted once its tombstones exceed this percentage
    /// of the bucket capacity
    pub compaction_percent: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lhkv_data"),
            bucket_capacity: 256,
            compressor: CompressorId::None,
            compaction_percent: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.bucket_capacity == 0 {
            return Err(LhkvError::Config(
                "bucket_capacity must be at least 1".to_string(),
            ));
        }
        if self.compaction_percent == 0 {
            return Err(LhkvError::Config(
                "compaction_percent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the table folder
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the default bucket capacity for a new table
    pub fn bucket_capacity(mut self, capacity: u32) -> Self {
        self.config.bucket_capacity = capacity;
        self
    }

    /// Set the default compressor for a new table
    pub fn compressor(mut self, compressor: CompressorId) -> Self {
        self.config.compressor = compressor;
        self
    }

    /// Set the tombstone percentage that triggers compaction
    pub fn compaction_percent(mut self, percent: u32) -> Self {
        self.config.compaction_percent = percent;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
