//! In-memory KV store backed by a `BTreeMap`.
//!
//! A fully functional [`KvEngine`] implementation suitable for testing and
//! lightweight use. All data lives in memory behind a `parking_lot::RwLock`;
//! iterators operate on a point-in-time snapshot taken at creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use kvfs_types::Result;

use crate::engine::{KvEngine, KvIter};

/// In-memory KV engine using a shared `BTreeMap`.
#[derive(Clone)]
pub struct MemDb {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemDb {
    /// Create a new, empty in-memory database.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Return the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Return whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemDb {
    fn default() -> Self {
        Self::new()
    }
}

impl KvEngine for MemDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn new_iter(&self) -> Result<Box<dyn KvIter + '_>> {
        // Snapshot the map so iteration is stable under concurrent writes.
        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(MemDbIter { entries, pos: 0 }))
    }
}

/// Snapshot iterator over the in-memory store.
pub struct MemDbIter {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
}

impl KvIter for MemDbIter {
    fn seek(&mut self, key: &[u8]) {
        // Entries are sorted; find the first one >= key.
        self.pos = self.entries.partition_point(|(k, _)| k.as_slice() < key);
    }

    fn valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    fn key(&self) -> &[u8] {
        match self.entries.get(self.pos) {
            Some((k, _)) => k,
            None => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match self.entries.get(self.pos) {
            Some((_, v)) => v,
            None => &[],
        }
    }

    fn next(&mut self) {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
    }

    fn status(&self) -> Result<()> {
        Ok(())
    }
}
