//! Key hashing
//!
//! Keys are never stored; a table only keeps their 16-byte digest.
//! XXH3-128 is used because it is stable across processes and platforms,
//! which the on-disk addressing depends on.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

/// Width of a hash key in bytes
pub const HASH_KEY_SIZE: usize = 16;

/// 16-byte digest of a key, ordered bytewise
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey([u8; HASH_KEY_SIZE]);

impl HashKey {
    /// Hash raw key bytes
    pub fn of(key: &[u8]) -> Self {
        Self(xxh3_128(key).to_be_bytes())
    }

    pub fn from_bytes(bytes: [u8; HASH_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_KEY_SIZE] {
        &self.0
    }

    /// Leading 8 bytes read as a big-endian integer; the addressing input
    pub fn prefix(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(head)
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashKey(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

impl From<[u8; HASH_KEY_SIZE]> for HashKey {
    fn from(bytes: [u8; HASH_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}
