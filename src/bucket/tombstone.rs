//! Per-bucket tombstone counter
//!
//! Counts archive blobs whose records were removed. The file holds a decimal
//! ASCII integer and only exists once the bucket has seen a deletion.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LhkvError, Result};

pub struct TombstoneCounter {
    path: PathBuf,
}

impl TombstoneCounter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current count; 0 when no deletion has happened yet
    pub fn load(&self) -> Result<u64> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        text.trim().parse().map_err(|_| LhkvError::CorruptIndex {
            path: self.path.clone(),
            reason: format!("tombstone count {:?} is not an integer", text.trim()),
        })
    }

    pub fn store(&self, count: u64) -> Result<()> {
        fs::write(&self.path, count.to_string())?;
        Ok(())
    }

    /// Add one tombstone and return the new count
    pub fn increment(&self) -> Result<u64> {
        let count = self.load()? + 1;
        self.store(count)?;
        Ok(count)
    }
}
