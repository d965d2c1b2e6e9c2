//! kvfs-kv: ordered key-value engine abstraction and backends.
//!
//! The metadata layer consumes a small blocking surface: point `get` /
//! `put` / `delete` plus a forward iterator with `seek` / `valid` /
//! `key` / `value` / `next`. [`MemDb`] is a fully functional in-memory
//! backend used by tests; the `rocksdb` feature adds a persistent
//! backend over the same trait.

pub mod engine;
pub mod memdb;

#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use engine::{KvEngine, KvIter};
pub use memdb::MemDb;

#[cfg(feature = "rocksdb")]
pub use crate::rocksdb::RocksDb;
