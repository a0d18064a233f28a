//! Parameter Store
//!
//! Table-wide settings persisted next to the buckets.
//!
//! ## File Format
//! A small JSON mapping, rewritten after every mutation:
//! ```text
//! {"bucket_capacity":256,"compressor":"snappy","count":1042}
//! ```
//!
//! Rewrites go through a `.tmp` sibling and a rename so a reader never
//! sees a half-written file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compress::CompressorId;
use crate::error::{LhkvError, Result};

/// Name of the parameter file within the table folder
pub const PARAMETERS_FILENAME: &str = "parameters.json";

const PARAMETERS_TMP_FILENAME: &str = "parameters.json.tmp";

/// Persisted table parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Records per bucket before the table grows
    pub bucket_capacity: u32,
    /// Compressor applied to archived values
    pub compressor: CompressorId,
    /// Number of live keys across all buckets
    pub count: u64,
}

impl Parameters {
    /// Parameters of a freshly created, empty table
    pub fn new(bucket_capacity: u32, compressor: CompressorId) -> Self {
        Self {
            bucket_capacity,
            compressor,
            count: 0,
        }
    }
}

/// Reads and writes the parameter file of one table folder
#[derive(Debug, Clone)]
pub struct ParameterStore {
    path: PathBuf,
}

impl ParameterStore {
    pub fn new(folder: &Path) -> Self {
        Self {
            path: folder.join(PARAMETERS_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load and sanity-check the stored parameters
    pub fn load(&self) -> Result<Parameters> {
        let bytes = fs::read(&self.path)?;
        let params: Parameters = serde_json::from_slice(&bytes)?;

        if params.bucket_capacity == 0 {
            return Err(LhkvError::Parameters(format!(
                "{} declares a bucket capacity of 0",
                self.path.display()
            )));
        }

        Ok(params)
    }

    /// Replace the parameter file
    pub fn save(&self, params: &Parameters) -> Result<()> {
        let tmp_path = self.path.with_file_name(PARAMETERS_TMP_FILENAME);
        let encoded = serde_json::to_vec(params)?;

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
