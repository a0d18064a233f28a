//! Error types for lhkv
//!
//! Provides a unified error type for all table operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LhkvError
pub type Result<T> = std::result::Result<T, LhkvError>;

/// Unified error type for lhkv operations
#[derive(Debug, Error)]
pub enum LhkvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Key already exists")]
    DuplicateKey,

    #[error("Key not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt bucket index {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Parameter file error: {0}")]
    Parameters(String),

    // -------------------------------------------------------------------------
    // Encoding Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LhkvError {
    /// True for the non-fatal "key is absent" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, LhkvError::NotFound)
    }
}

impl From<bincode::Error> for LhkvError {
    fn from(err: bincode::Error) -> Self {
        LhkvError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LhkvError {
    fn from(err: serde_json::Error) -> Self {
        LhkvError::Parameters(err.to_string())
    }
}

impl From<snap::Error> for LhkvError {
    fn from(err: snap::Error) -> Self {
        LhkvError::Compression(err.to_string())
    }
}
