//! Table Cache
//!
//! Bounded LRU of open tables, keyed by folder. The cache is an ordinary
//! owned value: whoever needs it holds it and passes it by reference.
//!
//! Handles are `Arc<Mutex<Table>>` so callers that share a table serialize
//! on the mutex, which is the single-writer rule the engine relies on.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::table::Table;

/// Shared handle to a cached table
pub type SharedTable = Arc<Mutex<Table>>;

/// Least-recently-used cache of open tables
pub struct TableCache {
    capacity: usize,
    tables: HashMap<PathBuf, SharedTable>,
    /// Front = least recently used
    recency: VecDeque<PathBuf>,
}

impl TableCache {
    /// Create a cache holding at most `capacity` tables (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tables: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Return the cached table for `config.data_dir`, opening it on a miss.
    /// A miss on a full cache evicts the least recently used table first.
    pub fn open(&mut self, config: Config) -> Result<SharedTable> {
        let folder = config.data_dir.clone();
        if let Some(table) = self.get(&folder) {
            return Ok(table);
        }

        let table = Arc::new(Mutex::new(Table::open(config)?));

        while self.tables.len() >= self.capacity {
            if !self.evict_lru()? {
                break;
            }
        }

        self.tables.insert(folder.clone(), Arc::clone(&table));
        self.recency.push_back(folder);
        Ok(table)
    }

    /// Cached table for `folder`, marking it most recently used
    pub fn get(&mut self, folder: &Path) -> Option<SharedTable> {
        let table = Arc::clone(self.tables.get(folder)?);
        self.touch(folder);
        Some(table)
    }

    pub fn contains(&self, folder: &Path) -> bool {
        self.tables.contains_key(folder)
    }

    /// Drop `folder` from the cache. Returns false if it was not cached.
    pub fn evict(&mut self, folder: &Path) -> Result<bool> {
        let Some(table) = self.tables.remove(folder) else {
            return Ok(false);
        };
        self.recency.retain(|cached| cached != folder);
        release(table)?;
        Ok(true)
    }

    /// Evict every table
    pub fn clear(&mut self) -> Result<()> {
        while self.evict_lru()? {}
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn touch(&mut self, folder: &Path) {
        if let Some(pos) = self.recency.iter().position(|cached| cached == folder) {
            if let Some(entry) = self.recency.remove(pos) {
                self.recency.push_back(entry);
            }
        }
    }

    fn evict_lru(&mut self) -> Result<bool> {
        let Some(folder) = self.recency.pop_front() else {
            return Ok(false);
        };
        if let Some(table) = self.tables.remove(&folder) {
            tracing::debug!(folder = %folder.display(), "evicting table");
            release(table)?;
        }
        Ok(true)
    }
}

/// Close the table if the cache held the last handle
fn release(table: SharedTable) -> Result<()> {
    match Arc::try_unwrap(table) {
        Ok(table) => table.into_inner().close(),
        Err(_) => Ok(()),
    }
}
