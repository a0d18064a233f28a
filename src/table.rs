//! Table Module
//!
//! The linear-hashing table that coordinates all components.
//!
//! ## Responsibilities
//! - Create or reopen a table folder and its parameters
//! - Route every key to its bucket under the current schedule
//! - Run split/merge migration when the bucket count changes
//! - Apply the compaction policy on delete
//! - Persist the live-key count after every mutation

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::addressing::Schedule;
use crate::bucket::Bucket;
use crate::compaction::CompactionPolicy;
use crate::compress::CompressorId;
use crate::config::Config;
use crate::error::{LhkvError, Result};
use crate::hash::HashKey;
use crate::migrate::Migrator;
use crate::params::{ParameterStore, Parameters};

/// Disk-backed key/value table with a linear-hashing bucket layout
///
/// ## Concurrency Model: Single Writer
///
/// - Mutations (`put`/`delete`) take `&mut self`; reads take `&self`
/// - No file locking: one `Table` per folder at a time
/// - No file handle outlives the call that opened it
///
/// Sharing a table across threads means wrapping it in a mutex, as
/// [`crate::cache::TableCache`] does.
pub struct Table {
    /// Table folder
    folder: PathBuf,

    /// Persisted capacity, compressor and count
    params: Parameters,

    /// Parameter file of `folder`
    store: ParameterStore,

    /// When to rewrite a bucket full of tombstones
    compaction: CompactionPolicy,

    /// Moves bucket files between schedules
    migrator: Migrator,
}

/// Snapshot of a table's on-disk state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Live keys according to the parameters
    pub count: u64,
    /// Buckets in the current schedule
    pub buckets: u64,
    /// Buckets with an index file
    pub occupied_buckets: u64,
    /// Records across all indexes
    pub records: u64,
    /// Unreclaimed archive blobs
    pub tombstones: u64,
    /// Total archive size
    pub archive_bytes: u64,
}

impl Table {
    /// Open or create a table
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Load `parameters.json` if the folder holds a table
    /// 3. Otherwise create the folder and write default parameters
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let folder = config.data_dir.clone();
        let store = ParameterStore::new(&folder);

        let params = if store.exists() {
            let params = store.load()?;
            tracing::info!(
                folder = %folder.display(),
                count = params.count,
                bucket_capacity = params.bucket_capacity,
                compressor = %params.compressor,
                "opened table"
            );
            params
        } else {
            fs::create_dir_all(&folder)?;
            let params = Parameters::new(config.bucket_capacity, config.compressor);
            store.save(&params)?;
            tracing::info!(
                folder = %folder.display(),
                bucket_capacity = params.bucket_capacity,
                compressor = %params.compressor,
                "created table"
            );
            params
        };

        let migrator = Migrator::new(&folder, params.compressor);

        Ok(Self {
            folder,
            params,
            store,
            compaction: CompactionPolicy::new(config.compaction_percent),
            migrator,
        })
    }

    /// Open with a folder and the defaults used if the table is new
    pub fn open_path(
        folder: impl AsRef<Path>,
        default_capacity: u32,
        default_compressor: CompressorId,
    ) -> Result<Self> {
        let config = Config::builder()
            .data_dir(folder.as_ref())
            .bucket_capacity(default_capacity)
            .compressor(default_compressor)
            .build();
        Self::open(config)
    }

    /// Store a value under a new key
    ///
    /// Steps:
    /// 1. Fail with `DuplicateKey` if the key is present
    /// 2. Split a bucket if the insert grows the bucket count
    /// 3. Append the value and splice the record into its bucket
    /// 4. Increment and persist the count
    pub fn put<K, V>(&mut self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: Serialize + ?Sized,
    {
        let hash = HashKey::of(key.as_ref());
        if self.contains_hash(&hash)? {
            return Err(LhkvError::DuplicateKey);
        }

        let count = self.params.count;
        let new_count = count + 1;
        self.migrator
            .migrate(count, new_count, self.params.bucket_capacity)?;

        let bucket = self.bucket_for(&hash, new_count);
        let blob = bucket.archive().encode(value)?;
        bucket.insert_blobs(&[(hash, blob)])?;

        self.set_count(new_count)
    }

    /// Fetch the value of a key; `NotFound` if it is absent
    pub fn get<K, V>(&self, key: K) -> Result<V>
    where
        K: AsRef<[u8]>,
        V: DeserializeOwned,
    {
        let hash = HashKey::of(key.as_ref());
        let bucket = self.bucket_for(&hash, self.params.count);
        let index = bucket.load_index()?;

        let slot = index.search(&hash).map_err(|_| LhkvError::NotFound)?;
        let record = index.get(slot).ok_or(LhkvError::NotFound)?;
        bucket.archive().read(record.offset, record.length)
    }

    /// Remove a key. Returns false, touching nothing, if it was absent.
    ///
    /// Steps:
    /// 1. Cut the record out of its bucket index
    /// 2. Delete the bucket if it emptied, else count a tombstone and
    ///    compact if the policy says so
    /// 3. Merge buckets if the delete shrinks the bucket count
    /// 4. Decrement and persist the count
    pub fn delete<K: AsRef<[u8]>>(&mut self, key: K) -> Result<bool> {
        let hash = HashKey::of(key.as_ref());
        let count = self.params.count;
        let bucket = self.bucket_for(&hash, count);

        let mut index = bucket.load_index()?;
        let Ok(slot) = index.search(&hash) else {
            return Ok(false);
        };
        index.remove_at(slot);

        if index.is_empty() {
            bucket.remove()?;
        } else {
            bucket.store_index(&index)?;
            let tombstones = bucket.tombstones().increment()?;
            self.compaction.apply(
                &self.migrator,
                bucket.address(),
                tombstones,
                self.params.bucket_capacity,
            )?;
        }

        let new_count = count - 1;
        self.migrator
            .migrate(count, new_count, self.params.bucket_capacity)?;

        self.set_count(new_count)?;
        Ok(true)
    }

    /// Check for a key without reading its value
    pub fn exists<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        self.contains_hash(&HashKey::of(key.as_ref()))
    }

    /// Write the parameters out
    pub fn flush(&self) -> Result<()> {
        self.store.save(&self.params)
    }

    /// Close the table, flushing its parameters
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Walk every bucket of the current schedule
    pub fn stats(&self) -> Result<TableStats> {
        let schedule = self.schedule();
        let mut stats = TableStats {
            count: self.params.count,
            buckets: schedule.num_buckets(),
            ..TableStats::default()
        };

        for address in schedule.addresses() {
            let bucket = Bucket::locate(&self.folder, address, self.params.compressor);
            if !bucket.exists() {
                continue;
            }
            stats.occupied_buckets += 1;
            stats.records += bucket.load_index()?.len() as u64;
            stats.tombstones += bucket.tombstones().load()?;
            stats.archive_bytes += bucket.archive().size()?;
        }

        Ok(stats)
    }

    /// Check the sort, routing and count invariants of every bucket
    pub fn verify(&self) -> Result<TableStats> {
        let schedule = self.schedule();

        for address in schedule.addresses() {
            let bucket = Bucket::locate(&self.folder, address, self.params.compressor);
            let index = bucket.load_index()?;

            if !index.is_strictly_sorted() {
                return Err(LhkvError::CorruptIndex {
                    path: bucket.index_path(),
                    reason: "records are not strictly ascending".to_string(),
                });
            }

            let stray = index.records().find(|r| schedule.address(&r.hash) != address);
            if let Some(stray) = stray {
                return Err(LhkvError::CorruptIndex {
                    path: bucket.index_path(),
                    reason: format!(
                        "{:?} belongs in bucket {}",
                        stray.hash,
                        schedule.address(&stray.hash)
                    ),
                });
            }
        }

        let stats = self.stats()?;
        if stats.records != stats.count {
            return Err(LhkvError::Parameters(format!(
                "count is {} but buckets hold {} records",
                stats.count, stats.records
            )));
        }

        Ok(stats)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Number of live keys
    pub fn len(&self) -> u64 {
        self.params.count
    }

    pub fn is_empty(&self) -> bool {
        self.params.count == 0
    }

    pub fn capacity(&self) -> u32 {
        self.params.bucket_capacity
    }

    pub fn compressor(&self) -> CompressorId {
        self.params.compressor
    }

    pub fn compaction(&self) -> &CompactionPolicy {
        &self.compaction
    }

    /// Linear-hashing schedule of the current count
    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.params.count, self.params.bucket_capacity)
    }

    /// Bucket currently holding (or due to hold) `key`
    pub fn bucket_of<K: AsRef<[u8]>>(&self, key: K) -> Bucket {
        self.bucket_for(&HashKey::of(key.as_ref()), self.params.count)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_for(&self, hash: &HashKey, count: u64) -> Bucket {
        let address = Schedule::new(count, self.params.bucket_capacity).address(hash);
        Bucket::locate(&self.folder, address, self.params.compressor)
    }

    fn contains_hash(&self, hash: &HashKey) -> Result<bool> {
        let bucket = self.bucket_for(hash, self.params.count);
        Ok(bucket.load_index()?.search(hash).is_ok())
    }

    fn set_count(&mut self, count: u64) -> Result<()> {
        self.params.count = count;
        self.store.save(&self.params)
    }
}
