//! Compaction Policy
//!
//! Deletes leave their archive blobs behind and bump the bucket's tombstone
//! counter. Once the counter exceeds a percentage of the bucket capacity the
//! bucket is rewritten from its live records, which reclaims the space and
//! resets the counter.

use crate::addressing::BucketAddress;
use crate::error::Result;
use crate::migrate::Migrator;

/// Decides when a bucket carries enough garbage to be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    percent: u32,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self { percent: 10 }
    }
}

impl CompactionPolicy {
    pub fn new(percent: u32) -> Self {
        Self { percent }
    }

    pub fn percent(&self) -> u32 {
        self.percent
    }

    /// True once `tombstones` exceeds `percent`% of `bucket_capacity`
    pub fn should_compact(&self, tombstones: u64, bucket_capacity: u32) -> bool {
        tombstones * 100 > u64::from(bucket_capacity) * u64::from(self.percent)
    }

    /// Apply the policy to a bucket that just gained a tombstone.
    /// Returns true if the bucket was compacted.
    pub fn apply(
        &self,
        migrator: &Migrator,
        address: BucketAddress,
        tombstones: u64,
        bucket_capacity: u32,
    ) -> Result<bool> {
        if !self.should_compact(tombstones, bucket_capacity) {
            return Ok(false);
        }

        let live = migrator.rewrite(address)?;
        tracing::debug!(bucket = %address, tombstones, live, "bucket compacted");
        Ok(true)
    }
}
