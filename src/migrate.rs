//! Split/Merge Migration
//!
//! Keeps the bucket files in step with the schedule when the bucket count
//! moves by one.
//!
//! ## Growth (n → n + 1)
//! With `m = max_bits`, `P = pow_max`, `t = split_threshold` of the old
//! schedule, the unsplit bucket `(m-1 bits, t)` fissions into a low child
//! `(m bits, t)` and a high child. When `n + 1` is not a power of two the
//! high child keeps the old name. When it is (the new threshold is 0) the
//! high child is `(m bits, t + P)`, and every remaining `(m-1)`-bit bucket
//! `v` becomes `(m bits, v + P)`: same hash residue, wider name.
//!
//! ## Shrink (n → n - 1)
//! The inverse. With `t > 0` the siblings `(m, t-1)` and `(m-1, t-1)` merge
//! into `(m-1, t-1)`. With `t == 0` the low sibling is `(m-1, P/2 - 1)`, the
//! high one `(m-1, P - 1)`, they merge into `(m-2, P/2 - 1)`, and the other
//! upper-half buckets narrow back to `m-2` bits.
//!
//! Records of fissioning or merging buckets are not reasoned about
//! individually: each one is re-addressed under the new schedule. Renamed
//! buckets move whole, so their archive offsets stay valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::addressing::{BucketAddress, Schedule};
use crate::bucket::Bucket;
use crate::compress::CompressorId;
use crate::error::Result;
use crate::hash::HashKey;

/// Direction of a schedule change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    Split,
    Merge,
}

/// File moves needed to go from one schedule to the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub kind: MigrationKind,
    pub from: Schedule,
    pub to: Schedule,
    /// Buckets whose records are re-inserted under `to`
    pub rehomed: Vec<BucketAddress>,
    /// Buckets that only change name
    pub renames: Vec<(BucketAddress, BucketAddress)>,
}

/// Work out the migration between two schedules, if any.
///
/// Only adjacent schedules (bucket counts one apart) are supported; that
/// is all a single put or delete can produce.
pub fn plan(from: Schedule, to: Schedule) -> Option<Migration> {
    let m = from.max_bits();
    let pow = from.pow_max();
    let threshold = from.split_threshold();

    if to.num_buckets() == from.num_buckets() + 1 {
        let source = BucketAddress::new(m - 1, threshold);
        let renames = if to.split_threshold() == 0 {
            (0..pow - 1)
                .map(|v| (BucketAddress::new(m - 1, v), BucketAddress::new(m, v + pow)))
                .collect()
        } else {
            Vec::new()
        };

        return Some(Migration {
            kind: MigrationKind::Split,
            from,
            to,
            rehomed: vec![source],
            renames,
        });
    }

    if to.num_buckets() + 1 == from.num_buckets() {
        let (rehomed, renames) = if threshold > 0 {
            (
                vec![
                    BucketAddress::new(m, threshold - 1),
                    BucketAddress::new(m - 1, threshold - 1),
                ],
                Vec::new(),
            )
        } else {
            let half = pow / 2;
            (
                vec![
                    BucketAddress::new(m - 1, half - 1),
                    BucketAddress::new(m - 1, pow - 1),
                ],
                (0..half - 1)
                    .map(|v| (BucketAddress::new(m - 1, v + half), BucketAddress::new(m - 2, v)))
                    .collect(),
            )
        };

        return Some(Migration {
            kind: MigrationKind::Merge,
            from,
            to,
            rehomed,
            renames,
        });
    }

    None
}

/// Executes migrations against one table folder
pub struct Migrator {
    folder: PathBuf,
    compressor: CompressorId,
}

impl Migrator {
    pub fn new(folder: &Path, compressor: CompressorId) -> Self {
        Self {
            folder: folder.to_path_buf(),
            compressor,
        }
    }

    fn bucket(&self, address: BucketAddress) -> Bucket {
        Bucket::locate(&self.folder, address, self.compressor)
    }

    /// Bring the bucket files from `from_count`'s schedule to `to_count`'s.
    /// Returns the migration performed, if the bucket count changed.
    pub fn migrate(&self, from_count: u64, to_count: u64, capacity: u32) -> Result<Option<Migration>> {
        let from = Schedule::new(from_count, capacity);
        let to = Schedule::new(to_count, capacity);

        match plan(from, to) {
            Some(migration) => {
                self.run(&migration)?;
                Ok(Some(migration))
            }
            None => Ok(None),
        }
    }

    /// Apply a planned migration
    pub fn run(&self, migration: &Migration) -> Result<()> {
        tracing::debug!(
            kind = ?migration.kind,
            from_buckets = migration.from.num_buckets(),
            to_buckets = migration.to.num_buckets(),
            rehomed = ?migration.rehomed.iter().map(|a| a.leaf_name()).collect::<Vec<_>>(),
            renames = migration.renames.len(),
            "migrating buckets"
        );

        // Set the fissioning/merging buckets aside before anything lands on
        // their names.
        let mut retired = Vec::new();
        for address in &migration.rehomed {
            if let Some(bucket) = self.bucket(*address).set_aside()? {
                retired.push(bucket);
            }
        }

        for (old, new) in &migration.renames {
            if self.bucket(*old).move_to(&self.bucket(*new))? {
                tracing::trace!(from = %old, to = %new, "bucket renamed");
            }
        }

        let mut targets: BTreeMap<BucketAddress, Vec<(HashKey, Vec<u8>)>> = BTreeMap::new();
        for bucket in &retired {
            for (hash, blob) in bucket.drain()? {
                targets
                    .entry(migration.to.address(&hash))
                    .or_default()
                    .push((hash, blob));
            }
        }

        for (address, entries) in &targets {
            tracing::trace!(bucket = %address, records = entries.len(), "re-inserting records");
            self.bucket(*address).insert_blobs(entries)?;
        }

        for bucket in retired {
            bucket.discard()?;
        }

        Ok(())
    }

    /// Rewrite one bucket in place, dropping archive bytes no record points
    /// at and resetting its tombstone counter
    pub fn rewrite(&self, address: BucketAddress) -> Result<usize> {
        let bucket = self.bucket(address);
        let Some(retired) = bucket.set_aside()? else {
            return Ok(0);
        };

        let entries = retired.drain()?;
        bucket.insert_blobs(&entries)?;
        retired.discard()?;

        Ok(entries.len())
    }
}
