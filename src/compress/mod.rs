//! Compressor Module
//!
//! Pluggable value compression for bucket archives.
//!
//! ## Responsibilities
//! - Define the capability every compressor offers
//! - Map the identifier stored in the parameter file to an implementation
//! - Name the archive file extension for each implementation
//!
//! ## Registry
//! | Id       | Implementation | Archive extension |
//! |----------|----------------|-------------------|
//! | `none`   | [`Identity`]   | `arc`             |
//! | `snappy` | [`Snappy`]     | `sz`              |

mod identity;
mod snappy;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LhkvError, Result};

pub use identity::Identity;
pub use snappy::Snappy;

/// Capability the archive store calls to shrink serialized values
pub trait Compressor: Send + Sync {
    /// Compress a serialized value
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// Reverse [`Compressor::compress`]
    fn uncompress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// File extension of the archives written with this compressor
    fn file_extension(&self) -> &'static str;
}

/// Identifier persisted in the table parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressorId {
    /// Values are stored as serialized
    #[default]
    None,

    /// Snappy raw format
    Snappy,
}

impl CompressorId {
    /// Resolve the identifier to its implementation
    pub fn compressor(self) -> &'static dyn Compressor {
        match self {
            CompressorId::None => &Identity,
            CompressorId::Snappy => &Snappy,
        }
    }

    /// Name used in the parameter file and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            CompressorId::None => "none",
            CompressorId::Snappy => "snappy",
        }
    }
}

impl fmt::Display for CompressorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressorId {
    type Err = LhkvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "identity" => Ok(CompressorId::None),
            "snappy" => Ok(CompressorId::Snappy),
            other => Err(LhkvError::Config(format!("unknown compressor: {}", other))),
        }
    }
}
