//! Persistent KV backend over RocksDB.
//!
//! Enabled with the `rocksdb` cargo feature. Wraps a single `DB` handle;
//! RocksDB already serializes point operations internally, so the engine
//! adds no locking of its own.

use std::path::Path;

use rocksdb::{DBRawIterator, Options, DB};
use tracing::info;

use kvfs_types::{make_error_msg, Result, StatusCode};

use crate::engine::{KvEngine, KvIter};

/// RocksDB-backed ordered KV engine.
pub struct RocksDb {
    db: DB,
}

impl RocksDb {
    /// Open (creating if missing) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = match DB::open(&opts, path) {
            Ok(db) => db,
            Err(e) => {
                return make_error_msg(
                    StatusCode::KV_STORE_OPEN_FAILED,
                    format!("open {}: {}", path.display(), e),
                )
            }
        };
        info!(path = %path.display(), "opened rocksdb metadata store");
        Ok(Self { db })
    }
}

impl KvEngine for RocksDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.db.get(key) {
            Ok(v) => Ok(v),
            Err(e) => make_error_msg(StatusCode::KV_STORE_GET_ERROR, e.to_string()),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.db.put(key, value) {
            Ok(()) => Ok(()),
            Err(e) => make_error_msg(StatusCode::KV_STORE_SET_ERROR, e.to_string()),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        match self.db.delete(key) {
            Ok(()) => Ok(()),
            Err(e) => make_error_msg(StatusCode::KV_STORE_SET_ERROR, e.to_string()),
        }
    }

    fn new_iter(&self) -> Result<Box<dyn KvIter + '_>> {
        Ok(Box::new(RocksIter {
            inner: self.db.raw_iterator(),
        }))
    }
}

/// Raw-iterator wrapper carrying the engine's error mapping.
pub struct RocksIter<'a> {
    inner: DBRawIterator<'a>,
}

impl KvIter for RocksIter<'_> {
    fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
    }

    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn key(&self) -> &[u8] {
        self.inner.key().unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.inner.value().unwrap_or(&[])
    }

    fn next(&mut self) {
        if self.inner.valid() {
            self.inner.next();
        }
    }

    fn status(&self) -> Result<()> {
        match self.inner.status() {
            Ok(()) => Ok(()),
            Err(e) => make_error_msg(StatusCode::KV_STORE_ITERATE_ERROR, e.to_string()),
        }
    }
}
