//! Bucket Addressing
//!
//! Maps a key hash to its bucket under the linear-hashing schedule implied
//! by `(count, bucket_capacity)`. Nothing here is cached: the schedule is
//! recomputed from the persisted count on every access, so a reopened table
//! addresses exactly like the process that wrote it.
//!
//! ## Schedule
//! ```text
//! num_buckets     = max(1, ceil(count / capacity))
//! max_bits        = ceil(log2(num_buckets + 1))
//! pow_max         = 2^(max_bits - 1)
//! split_threshold = num_buckets - pow_max
//! ```
//! Addresses whose low `max_bits` bits fall below `split_threshold` have
//! already been split and use `max_bits` bits; every other address uses
//! `max_bits - 1` bits.
//!
//! ## Layout
//! ```text
//! {folder}/_.idx                      num_bits == 0 (single bucket)
//! {folder}/0110.idx                   num_bits <= 8
//! {folder}/5/10110100101.idx          9 <= num_bits <= 16
//! {folder}/1/5/1000000101...01.idx    17 <= num_bits <= 24
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::hash::HashKey;

/// Leaf name of the zero-bit address, used while the table fits in one bucket
pub const ROOT_LEAF: &str = "_";

/// Bit statistics describing the linear-hashing schedule for one count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    num_buckets: u64,
    max_bits: u32,
    pow_max: u64,
    split_threshold: u64,
}

impl Schedule {
    /// Compute the schedule for `count` live keys
    pub fn new(count: u64, bucket_capacity: u32) -> Self {
        let capacity = u64::from(bucket_capacity.max(1));
        let num_buckets = count.div_ceil(capacity).max(1);

        // Bit length of num_buckets == ceil(log2(num_buckets + 1))
        let max_bits = u64::BITS - num_buckets.leading_zeros();
        let pow_max = 1u64 << (max_bits - 1);

        Self {
            num_buckets,
            max_bits,
            pow_max,
            split_threshold: num_buckets - pow_max,
        }
    }

    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    pub fn max_bits(&self) -> u32 {
        self.max_bits
    }

    pub fn pow_max(&self) -> u64 {
        self.pow_max
    }

    pub fn split_threshold(&self) -> u64 {
        self.split_threshold
    }

    /// Address of the bucket owning `hash`
    pub fn address(&self, hash: &HashKey) -> BucketAddress {
        let h = hash.prefix();
        let masked = h & low_mask(self.max_bits);
        let bits = if masked < self.split_threshold {
            self.max_bits
        } else {
            self.max_bits - 1
        };
        BucketAddress::new(bits, h)
    }

    /// Every bucket address of this schedule: the split (`max_bits` wide)
    /// buckets first, then the unsplit ones
    pub fn addresses(&self) -> impl Iterator<Item = BucketAddress> {
        let wide = self.max_bits;
        let narrow = self.max_bits - 1;
        (0..self.split_threshold)
            .map(move |value| BucketAddress::new(wide, value))
            .chain((0..self.pow_max).map(move |value| BucketAddress::new(narrow, value)))
    }
}

/// A bucket's hash prefix: the low `bits` bits of the hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketAddress {
    bits: u32,
    value: u64,
}

impl BucketAddress {
    /// Build an address, masking `value` down to `bits` bits
    pub fn new(bits: u32, value: u64) -> Self {
        Self {
            bits,
            value: value & low_mask(bits),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Zero-padded binary digits of the address, or [`ROOT_LEAF`]
    pub fn leaf_name(&self) -> String {
        if self.bits == 0 {
            ROOT_LEAF.to_string()
        } else {
            format!("{:0width$b}", self.value, width = self.bits as usize)
        }
    }

    /// Folder-relative path of the bucket, without a file extension.
    ///
    /// One directory per address byte above the lowest, most significant
    /// first, so no directory holds more than a few hundred buckets.
    pub fn relative_stem(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for group in (1..8u32).rev() {
            let offset = group * 8;
            if self.bits > offset {
                path.push(((self.value >> offset) & 0xFF).to_string());
            }
        }
        path.push(self.leaf_name());
        path
    }

    /// Bucket path below `folder`, without a file extension
    pub fn stem_in(&self, folder: &Path) -> PathBuf {
        folder.join(self.relative_stem())
    }

    /// Creating form of [`BucketAddress::stem_in`]: also makes the fan-out
    /// directories
    pub fn create_stem_in(&self, folder: &Path) -> Result<PathBuf> {
        let stem = self.stem_in(folder);
        if let Some(parent) = stem.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(stem)
    }
}

impl fmt::Display for BucketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.leaf_name())
    }
}

/// Bucket path (without extension) for `hash` under the given schedule inputs
pub fn bucket_path(folder: &Path, hash: &HashKey, count: u64, bucket_capacity: u32) -> PathBuf {
    Schedule::new(count, bucket_capacity)
        .address(hash)
        .stem_in(folder)
}

fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
