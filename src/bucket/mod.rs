//! Bucket Module
//!
//! On-disk storage unit addressed by a hash prefix.
//!
//! ## Responsibilities
//! - Resolve the three sibling files of a bucket
//! - Load/store the sorted index, dropping files once it empties
//! - Move a bucket to a new address (rename, offsets stay valid)
//! - Set a bucket aside so its records can be re-inserted elsewhere
//!
//! ## Files
//! ```text
//! {stem}.idx     sorted 32-byte records          (see index)
//! {stem}.{ext}   compressed value log            (see archive)
//! {stem}.tomb    decimal tombstone count         (optional)
//! ```

mod archive;
mod index;
mod tombstone;

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::addressing::BucketAddress;
use crate::compress::CompressorId;
use crate::error::{LhkvError, Result};
use crate::hash::HashKey;

pub use archive::Archive;
pub use index::{search, BucketIndex, Record, RECORD_SIZE};
pub use tombstone::TombstoneCounter;

const INDEX_EXTENSION: &str = "idx";
const TOMBSTONE_EXTENSION: &str = "tomb";
const ASIDE_SUFFIX: &str = "old";

/// Handle on one bucket's files below a table folder
#[derive(Debug, Clone)]
pub struct Bucket {
    address: BucketAddress,
    folder: PathBuf,
    stem: PathBuf,
    compressor: CompressorId,
}

impl Bucket {
    pub fn locate(folder: &Path, address: BucketAddress, compressor: CompressorId) -> Self {
        Self {
            address,
            folder: folder.to_path_buf(),
            stem: address.stem_in(folder),
            compressor,
        }
    }

    pub fn address(&self) -> BucketAddress {
        self.address
    }

    pub fn index_path(&self) -> PathBuf {
        with_extension(&self.stem, INDEX_EXTENSION)
    }

    pub fn archive_path(&self) -> PathBuf {
        with_extension(&self.stem, self.compressor.compressor().file_extension())
    }

    pub fn tombstone_path(&self) -> PathBuf {
        with_extension(&self.stem, TOMBSTONE_EXTENSION)
    }

    /// A bucket exists once its index file does
    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    pub fn archive(&self) -> Archive {
        Archive::new(self.archive_path(), self.compressor.compressor())
    }

    pub fn tombstones(&self) -> TombstoneCounter {
        TombstoneCounter::new(self.tombstone_path())
    }

    pub fn load_index(&self) -> Result<BucketIndex> {
        BucketIndex::load(&self.index_path())
    }

    /// Persist `index`; an empty index deletes the bucket entirely
    pub fn store_index(&self, index: &BucketIndex) -> Result<()> {
        if index.is_empty() {
            return self.remove();
        }
        self.address.create_stem_in(&self.folder)?;
        index.save(&self.index_path())
    }

    /// Delete the index, archive and tombstone files, then any fan-out
    /// directory left empty
    pub fn remove(&self) -> Result<()> {
        for path in [self.index_path(), self.archive_path(), self.tombstone_path()] {
            remove_if_present(&path)?;
        }
        prune_empty_dirs(&self.folder, &self.stem)
    }

    /// Append blobs and splice their records into the index.
    ///
    /// Used for every write path, including migration, so a bucket's
    /// records always point into its own archive.
    pub fn insert_blobs(&self, entries: &[(HashKey, Vec<u8>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut index = self.load_index()?;
        self.address.create_stem_in(&self.folder)?;
        let placed = self
            .archive()
            .append_blobs(entries.iter().map(|(_, blob)| blob.as_slice()))?;

        for ((hash, _), (offset, length)) in entries.iter().zip(placed) {
            let record = Record::new(*hash, offset, length);
            if index.insert_sorted(&record).is_none() {
                return Err(LhkvError::CorruptIndex {
                    path: self.index_path(),
                    reason: format!("{:?} would be stored twice", hash),
                });
            }
            tracing::trace!(bucket = %self.address, hash = ?hash, offset, length, "record inserted");
        }

        self.store_index(&index)
    }

    /// Rename this bucket's files to `target`'s paths. Returns false if
    /// there was nothing to move.
    pub fn move_to(&self, target: &Bucket) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        target.address.create_stem_in(&target.folder)?;

        fs::rename(self.index_path(), target.index_path())?;
        rename_if_present(&self.archive_path(), &target.archive_path())?;
        rename_if_present(&self.tombstone_path(), &target.tombstone_path())?;
        prune_empty_dirs(&self.folder, &self.stem)?;
        Ok(true)
    }

    /// Rename the bucket's files aside and return them for draining.
    /// The bucket itself is empty afterwards.
    pub fn set_aside(&self) -> Result<Option<RetiredBucket>> {
        if !self.exists() {
            // A stray archive without an index holds nothing reachable
            remove_if_present(&self.archive_path())?;
            remove_if_present(&self.tombstone_path())?;
            return Ok(None);
        }

        let retired = RetiredBucket {
            address: self.address,
            folder: self.folder.clone(),
            index_path: with_extension(&self.index_path(), ASIDE_SUFFIX),
            archive_path: with_extension(&self.archive_path(), ASIDE_SUFFIX),
        };

        fs::rename(self.index_path(), &retired.index_path)?;
        rename_if_present(&self.archive_path(), &retired.archive_path)?;
        remove_if_present(&self.tombstone_path())?;

        Ok(Some(retired))
    }
}

/// A bucket's files after [`Bucket::set_aside`]
#[derive(Debug)]
pub struct RetiredBucket {
    address: BucketAddress,
    folder: PathBuf,
    index_path: PathBuf,
    archive_path: PathBuf,
}

impl RetiredBucket {
    pub fn address(&self) -> BucketAddress {
        self.address
    }

    /// Every live record with its compressed blob
    pub fn drain(&self) -> Result<Vec<(HashKey, Vec<u8>)>> {
        let index = BucketIndex::load(&self.index_path)?;
        index
            .records()
            .map(|record| {
                let blob = archive::read_blob_at(&self.archive_path, record.offset, record.length)?;
                Ok((record.hash, blob))
            })
            .collect()
    }

    /// Delete the set-aside files
    pub fn discard(self) -> Result<()> {
        remove_if_present(&self.index_path)?;
        remove_if_present(&self.archive_path)?;
        prune_empty_dirs(&self.folder, &self.index_path)
    }
}

fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove the empty directories between `path` and `folder`, deepest first.
/// Stops at the first directory that still holds an entry.
fn prune_empty_dirs(folder: &Path, path: &Path) -> Result<()> {
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == folder || !current.starts_with(folder) {
            break;
        }
        match fs::read_dir(current) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    break;
                }
                match fs::remove_dir(current) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        dir = current.parent();
    }
    Ok(())
}

fn rename_if_present(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
