//! Bucket Index
//!
//! Sorted array of fixed-width records, stored as one file per bucket.
//!
//! ## Record Format (32 bytes)
//! ```text
//! ┌──────────────────────┬──────────────────┬──────────────────┐
//! │ HashKey (16)         │ Offset: u64 BE   │ Length: u64 BE   │
//! └──────────────────────┴──────────────────┴──────────────────┘
//! ```
//! Records are strictly ascending by hash key. The file is the bare
//! concatenation of records; no header, no footer.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::{Buf, BufMut};

use crate::error::{LhkvError, Result};
use crate::hash::{HashKey, HASH_KEY_SIZE};

/// Size of one encoded record
pub const RECORD_SIZE: usize = HASH_KEY_SIZE + 8 + 8;

/// Points a hash key at its blob in the bucket archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub hash: HashKey,
    /// Byte offset of the blob in the archive
    pub offset: u64,
    /// Compressed blob length
    pub length: u64,
}

impl Record {
    pub fn new(hash: HashKey, offset: u64, length: u64) -> Self {
        Self {
            hash,
            offset,
            length,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(self.hash.as_bytes());
        buf.put_u64(self.offset);
        buf.put_u64(self.length);
        out
    }

    /// Decode one record; `bytes` must hold at least [`RECORD_SIZE`] bytes
    pub fn decode(mut bytes: &[u8]) -> Self {
        let mut hash = [0u8; HASH_KEY_SIZE];
        bytes.copy_to_slice(&mut hash);
        let offset = bytes.get_u64();
        let length = bytes.get_u64();
        Self::new(HashKey::from_bytes(hash), offset, length)
    }
}

/// Binary search over packed index bytes.
///
/// Returns `Ok(slot)` when `key` is present and `Err(slot)` with the
/// insertion slot that keeps the array sorted when it is not. The midpoint
/// over the inclusive bounds rounds up, and each probe discards itself along
/// with the losing side. `insert_at` relies on the `Err` slot being exact.
pub fn search(index: &[u8], key: &HashKey) -> std::result::Result<usize, usize> {
    let slots = index.len() / RECORD_SIZE;
    if slots == 0 {
        return Err(0);
    }

    let key_at = |slot: usize| {
        let start = slot * RECORD_SIZE;
        &index[start..start + HASH_KEY_SIZE]
    };

    let target = &key.as_bytes()[..];
    let mut low = 0usize;
    let mut high = slots - 1;
    let mut current = (low + high + 1) / 2;

    loop {
        match target.cmp(key_at(current)) {
            std::cmp::Ordering::Equal => return Ok(current),
            std::cmp::Ordering::Less => {
                if current <= low {
                    return Err(low);
                }
                high = current - 1;
            }
            std::cmp::Ordering::Greater => {
                if current >= high {
                    return Err(current + 1);
                }
                low = current + 1;
            }
        }
        current = (low + high + 1) / 2;
    }
}

/// In-memory copy of one bucket's index file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketIndex {
    data: Vec<u8>,
}

impl BucketIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw index bytes; `None` if the length is not a whole number
    /// of records
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        if data.len() % RECORD_SIZE != 0 {
            return None;
        }
        Some(Self { data })
    }

    /// Read an index file. A missing file is an empty bucket.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let len = data.len();
        Self::from_bytes(data).ok_or_else(|| LhkvError::CorruptIndex {
            path: path.to_path_buf(),
            reason: format!(
                "length {} is not a multiple of the {}-byte record",
                len, RECORD_SIZE
            ),
        })
    }

    /// Rewrite the index file through a temporary sibling
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&self.data)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len() / RECORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn search(&self, key: &HashKey) -> std::result::Result<usize, usize> {
        search(&self.data, key)
    }

    pub fn get(&self, slot: usize) -> Option<Record> {
        let start = slot.checked_mul(RECORD_SIZE)?;
        let bytes = self.data.get(start..start + RECORD_SIZE)?;
        Some(Record::decode(bytes))
    }

    /// Splice `record` in at `slot`, shifting later records up one width
    pub fn insert_at(&mut self, slot: usize, record: &Record) {
        let at = slot * RECORD_SIZE;
        self.data.splice(at..at, record.encode());
    }

    /// Cut the record at `slot` out, shifting later records down one width
    pub fn remove_at(&mut self, slot: usize) -> Record {
        let at = slot * RECORD_SIZE;
        let removed = Record::decode(&self.data[at..at + RECORD_SIZE]);
        self.data.drain(at..at + RECORD_SIZE);
        removed
    }

    /// Insert keeping sort order; returns the slot, or `None` if the key
    /// is already present
    pub fn insert_sorted(&mut self, record: &Record) -> Option<usize> {
        match self.search(&record.hash) {
            Ok(_) => None,
            Err(slot) => {
                self.insert_at(slot, record);
                Some(slot)
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.data.chunks_exact(RECORD_SIZE).map(Record::decode)
    }

    /// True if every hash key is strictly greater than its predecessor
    pub fn is_strictly_sorted(&self) -> bool {
        self.data
            .chunks_exact(RECORD_SIZE)
            .zip(self.data.chunks_exact(RECORD_SIZE).skip(1))
            .all(|(a, b)| a[..HASH_KEY_SIZE] < b[..HASH_KEY_SIZE])
    }
}
