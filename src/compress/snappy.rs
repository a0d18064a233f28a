//! Snappy compressor
//!
//! Each blob is an independent raw-format frame, so any blob can be read
//! back from its offset without touching its neighbours.

use snap::raw::{Decoder, Encoder};

use crate::error::Result;

use super::Compressor;

/// Snappy raw-format compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct Snappy;

impl Compressor for Snappy {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(Encoder::new().compress_vec(bytes)?)
    }

    fn uncompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(Decoder::new().decompress_vec(bytes)?)
    }

    fn file_extension(&self) -> &'static str {
        "sz"
    }
}
