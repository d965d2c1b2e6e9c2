//! Metadata store: typed record operations over the ordered KV engine.
//!
//! A thin translation layer. Point operations map one-to-one onto engine
//! calls; directory listing is a single forward range scan bounded by the
//! parent's key prefix. The store adds no locking of its own, relying on
//! the engine's per-call atomicity.

use std::sync::Arc;

use tracing::{debug, warn};

use kvfs_kv::KvEngine;
use kvfs_types::{make_error_msg, MetaCode, Result};

use crate::codec::{children_range, InodeAttrs, InodeId, InodeKey, InodeRecord, ROOT_INODE_ID};

/// Process-wide metadata store over one backing engine.
#[derive(Clone)]
pub struct MetadataStore {
    engine: Arc<dyn KvEngine>,
}

impl MetadataStore {
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self { engine }
    }

    /// Point lookup; never allocates a record, never mutates.
    pub fn exists(&self, key: &InodeKey) -> Result<bool> {
        Ok(self.engine.get(&key.encode())?.is_some())
    }

    /// Fetch and decode the record at `key`.
    pub fn get_record(&self, key: &InodeKey) -> Result<InodeRecord> {
        match self.engine.get(&key.encode())? {
            Some(bytes) => InodeRecord::decode(&bytes),
            None => make_error_msg(
                MetaCode::NOT_FOUND,
                format!("no record for parent {} hash {:#x}", key.parent, key.name_hash),
            ),
        }
    }

    /// Insert or replace the record at `key` as a single point write.
    pub fn put_record(&self, key: &InodeKey, record: &InodeRecord) -> Result<()> {
        debug!(
            parent = key.parent,
            ino = record.attrs.ino,
            name = %record.name,
            "put record"
        );
        self.engine.put(&key.encode(), &record.encode())
    }

    /// Remove the record at `key`. The key reads as absent as soon as this
    /// returns.
    pub fn delete_record(&self, key: &InodeKey) -> Result<()> {
        debug!(parent = key.parent, hash = key.name_hash, "delete record");
        self.engine.delete(&key.encode())
    }

    /// Read-modify-write convenience: load the record, let `mutate` adjust
    /// the attributes, write it back with the name unchanged.
    ///
    /// Not atomic against concurrent writers of the same key; the write
    /// step is last-write-wins. Callers needing atomicity must serialize
    /// externally.
    pub fn update_attrs<F>(&self, key: &InodeKey, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut InodeAttrs),
    {
        let mut record = self.get_record(key)?;
        mutate(&mut record.attrs);
        self.put_record(key, &record)
    }

    /// List every child record of `parent` in key order.
    ///
    /// The root's own storage slot lives inside the root's child range and
    /// carries the sentinel inode id; it is filtered out here. A child
    /// value that fails decoding is skipped with a warning rather than
    /// aborting the whole listing.
    pub fn list_children(&self, parent: InodeId) -> Result<Vec<InodeRecord>> {
        let (begin, end) = children_range(parent);
        let mut out = Vec::new();

        let mut it = self.engine.new_iter()?;
        it.seek(&begin);
        while it.valid() {
            if let Some(end) = &end {
                if it.key() >= end.as_slice() {
                    break;
                }
            }
            match InodeRecord::decode(it.value()) {
                Ok(record) => {
                    if record.attrs.ino != ROOT_INODE_ID {
                        out.push(record);
                    }
                }
                Err(status) => {
                    let key = InodeKey::decode(it.key()).unwrap_or(InodeKey {
                        parent,
                        name_hash: 0,
                    });
                    warn!(
                        parent = key.parent,
                        hash = key.name_hash,
                        %status,
                        "skipping undecodable child record"
                    );
                }
            }
            it.next();
        }
        it.status()?;

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Timespec;
    use kvfs_kv::MemDb;

    fn store() -> MetadataStore {
        MetadataStore::new(Arc::new(MemDb::new()))
    }

    fn file_record(ino: InodeId, name: &str) -> InodeRecord {
        let now = Timespec { sec: 100, nsec: 0 };
        InodeRecord::new(InodeAttrs::new_file(ino, 0o644, 1000, 1000, now), name)
    }

    #[test]
    fn test_put_get_exists_delete() {
        let store = store();
        let key = InodeKey::for_entry(0, "a.txt");
        assert!(!store.exists(&key).unwrap());

        let rec = file_record(5, "a.txt");
        store.put_record(&key, &rec).unwrap();
        assert!(store.exists(&key).unwrap());
        assert_eq!(store.get_record(&key).unwrap(), rec);

        store.delete_record(&key).unwrap();
        assert!(!store.exists(&key).unwrap());
        let err = store.get_record(&key).unwrap_err();
        assert_eq!(err.code(), MetaCode::NOT_FOUND);
    }

    #[test]
    fn test_put_is_upsert() {
        let store = store();
        let key = InodeKey::for_entry(0, "a.txt");
        store.put_record(&key, &file_record(5, "a.txt")).unwrap();

        let mut updated = file_record(5, "a.txt");
        updated.attrs.size = 999;
        store.put_record(&key, &updated).unwrap();
        assert_eq!(store.get_record(&key).unwrap().attrs.size, 999);
    }

    #[test]
    fn test_get_malformed_value() {
        let engine = Arc::new(MemDb::new());
        let store = MetadataStore::new(engine.clone());
        let key = InodeKey::for_entry(0, "bad");
        engine.put(&key.encode(), b"short").unwrap();

        let err = store.get_record(&key).unwrap_err();
        assert_eq!(err.code(), MetaCode::MALFORMED_RECORD);
    }

    #[test]
    fn test_update_attrs() {
        let store = store();
        let key = InodeKey::for_entry(0, "a.txt");
        store.put_record(&key, &file_record(5, "a.txt")).unwrap();

        store
            .update_attrs(&key, |attrs| {
                attrs.size = 4096;
                attrs.mtime = Timespec { sec: 777, nsec: 1 };
            })
            .unwrap();

        let rec = store.get_record(&key).unwrap();
        assert_eq!(rec.attrs.size, 4096);
        assert_eq!(rec.attrs.mtime.sec, 777);
        // The name rides along unchanged.
        assert_eq!(rec.name, "a.txt");
    }

    #[test]
    fn test_update_attrs_missing_key() {
        let store = store();
        let key = InodeKey::for_entry(0, "ghost");
        let err = store.update_attrs(&key, |_| {}).unwrap_err();
        assert_eq!(err.code(), MetaCode::NOT_FOUND);
    }

    #[test]
    fn test_list_children_exact_set() {
        let store = store();
        // Children of parent 1.
        for (ino, name) in [(10, "x"), (11, "y"), (12, "z")] {
            store
                .put_record(&InodeKey::for_entry(1, name), &file_record(ino, name))
                .unwrap();
        }
        // Entries of other parents must not leak into the listing.
        store
            .put_record(&InodeKey::for_entry(0, "other"), &file_record(20, "other"))
            .unwrap();
        store
            .put_record(&InodeKey::for_entry(2, "more"), &file_record(21, "more"))
            .unwrap();

        let children = store.list_children(1).unwrap();
        let mut names: Vec<&str> = children.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_list_children_skips_root_sentinel() {
        let store = store();
        let now = Timespec { sec: 1, nsec: 0 };
        // Root's own record sits at (0, 0) with the sentinel inode id.
        store
            .put_record(
                &InodeKey::root(),
                &InodeRecord::new(InodeAttrs::root(now), "/"),
            )
            .unwrap();
        store
            .put_record(&InodeKey::for_entry(0, "top"), &file_record(7, "top"))
            .unwrap();

        let children = store.list_children(ROOT_INODE_ID).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "top");
    }

    #[test]
    fn test_list_children_empty_dir() {
        let store = store();
        assert!(store.list_children(42).unwrap().is_empty());
    }

    #[test]
    fn test_list_children_skips_corrupt_value() {
        let engine = Arc::new(MemDb::new());
        let store = MetadataStore::new(engine.clone());
        store
            .put_record(&InodeKey::for_entry(3, "good"), &file_record(8, "good"))
            .unwrap();
        engine
            .put(&InodeKey::for_entry(3, "corrupt").encode(), b"junk")
            .unwrap();

        let children = store.list_children(3).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "good");
    }

    #[test]
    fn test_list_children_last_parent() {
        let store = store();
        store
            .put_record(
                &InodeKey::for_entry(u64::MAX, "edge"),
                &file_record(9, "edge"),
            )
            .unwrap();
        let children = store.list_children(u64::MAX).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "edge");
    }
}
