//! Pass-through compressor

use crate::error::Result;

use super::Compressor;

/// Stores values exactly as serialized
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Compressor for Identity {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn uncompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn file_extension(&self) -> &'static str {
        "arc"
    }
}
