//! # lhkv
//!
//! A disk-backed key/value table for dictionary and metadata storage with:
//! - Linear hashing: the bucket count follows the key count one bucket
//!   at a time, no full rehash
//! - Directory-free addressing recomputed from the persisted count
//! - Sorted fixed-width bucket indexes with binary-search lookup
//! - Append-only, pluggably compressed value archives
//! - Tombstone-driven bucket compaction
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Table                              │
//! │             put / get / delete / exists (1 writer)          │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//! ┌─────────────┐      ┌─────────────────┐     ┌─────────────────┐
//! │ Parameters  │      │   Addressing    │     │    Migrator     │
//! │ (count etc) │      │ (hash → bucket) │     │ (split / merge) │
//! └─────────────┘      └────────┬────────┘     └────────┬────────┘
//!                               │                       │
//!                               ▼                       ▼
//!                      ┌─────────────────────────────────────────┐
//!                      │                Bucket                   │
//!                      │  .idx (sorted)  .arc (log)  .tomb (ctr) │
//!                      └─────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hash;
pub mod compress;
pub mod params;
pub mod addressing;
pub mod bucket;
pub mod migrate;
pub mod compaction;
pub mod table;
pub mod cache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LhkvError, Result};
pub use config::Config;
pub use compress::CompressorId;
pub use table::{Table, TableStats};
pub use cache::TableCache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lhkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
