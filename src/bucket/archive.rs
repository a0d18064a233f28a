//! Archive Store
//!
//! Append-only value log of one bucket.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────┬──────────────────────────┬─────┐
//! │ compress(serialize(v1))  │ compress(serialize(v2))  │ ... │
//! └──────────────────────────┴──────────────────────────┴─────┘
//! ```
//! Blobs carry no framing; the bucket index holds each blob's offset and
//! length. Deleted values stay in place until the bucket is rewritten.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::compress::Compressor;
use crate::error::{LhkvError, Result};

/// Value log of one bucket, opened per call
pub struct Archive {
    path: PathBuf,
    compressor: &'static dyn Compressor,
}

impl Archive {
    pub fn new(path: PathBuf, compressor: &'static dyn Compressor) -> Self {
        Self { path, compressor }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize, compress and append a value; returns `(offset, length)`
    /// of the compressed blob
    pub fn append<V: Serialize + ?Sized>(&self, value: &V) -> Result<(u64, u64)> {
        let blob = self.encode(value)?;
        self.append_blob(&blob)
    }

    /// Append an already compressed blob
    pub fn append_blob(&self, blob: &[u8]) -> Result<(u64, u64)> {
        let mut placed = self.append_blobs(std::iter::once(blob))?;
        Ok(placed.remove(0))
    }

    /// Append several compressed blobs with a single open
    pub fn append_blobs<'a, I>(&self, blobs: I) -> Result<Vec<(u64, u64)>>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut offset = file.metadata()?.len();
        let mut placed = Vec::new();
        for blob in blobs {
            file.write_all(blob)?;
            placed.push((offset, blob.len() as u64));
            offset += blob.len() as u64;
        }
        file.flush()?;

        Ok(placed)
    }

    /// Read and decode the value stored at `offset`
    pub fn read<V: DeserializeOwned>(&self, offset: u64, length: u64) -> Result<V> {
        let blob = self.read_blob(offset, length)?;
        self.decode(&blob)
    }

    /// Read the raw compressed blob at `offset`
    pub fn read_blob(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        read_blob_at(&self.path, offset, length)
    }

    /// Current archive size in bytes; 0 when the file does not exist
    pub fn size(&self) -> Result<u64> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    pub fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        let serialized = bincode::serialize(value)?;
        self.compressor.compress(&serialized)
    }

    pub fn decode<V: DeserializeOwned>(&self, blob: &[u8]) -> Result<V> {
        let serialized = self.compressor.uncompress(blob)?;
        Ok(bincode::deserialize(&serialized)?)
    }
}

/// Read `length` bytes at `offset` of the file at `path`.
/// A range past the end of the file is `CorruptIndex`: the record that
/// pointed there cannot be trusted.
pub(crate) fn read_blob_at(path: &Path, offset: u64, length: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    match offset.checked_add(length) {
        Some(end) if end <= file_len => {}
        _ => {
            return Err(LhkvError::CorruptIndex {
                path: path.to_path_buf(),
                reason: format!(
                    "blob {}+{} runs past the {}-byte archive",
                    offset, length, file_len
                ),
            })
        }
    }
    file.seek(SeekFrom::Start(offset))?;

    let mut blob = vec![0u8; length as usize];
    file.read_exact(&mut blob)?;
    Ok(blob)
}
