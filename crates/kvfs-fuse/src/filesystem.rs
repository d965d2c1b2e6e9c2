//! Metadata filesystem: the `FsOps` implementation over the store.
//!
//! Paths resolve by walking components from the root, one point lookup
//! per component. Every lookup that knows the requested name verifies it
//! against the stored record's name, so a hash collision or a corrupted
//! record surfaces as an I/O error instead of silently aliasing entries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use kvfs_meta::{
    path, FsState, InodeAttrs, InodeId, InodeKey, InodeRecord, KeyRegistry, MetadataStore,
    Timespec, ROOT_INODE_ID,
};
use kvfs_types::{MetaCode, Status};

use crate::config::FsConfig;
use crate::ops::{DirFiller, FileAttr, FsOps, FsResult, RequestContext};

/// Filesystem handler holding the process-wide collaborators.
pub struct MetaFileSystem {
    store: MetadataStore,
    state: Arc<FsState>,
    /// Reserved for content addressing; no handler invokes it yet.
    registry: Arc<KeyRegistry>,
    config: FsConfig,
}

fn to_errno(status: Status) -> i32 {
    debug!(%status, "metadata operation failed");
    status.errno()
}

impl MetaFileSystem {
    pub fn new(store: MetadataStore, state: Arc<FsState>, config: FsConfig) -> Self {
        Self {
            store,
            state,
            registry: Arc::new(KeyRegistry::new()),
            config,
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    fn check_readonly(&self) -> FsResult<()> {
        if self.config.readonly {
            Err(libc::EROFS)
        } else {
            Ok(())
        }
    }

    /// Load the record for `name` under `parent`, verifying that the
    /// stored name matches the requested one. A mismatch means a hash
    /// collision or corruption and reads as an I/O fault.
    fn load_child(&self, parent: InodeId, name: &str) -> FsResult<(InodeKey, InodeRecord)> {
        let key = InodeKey::for_entry(parent, name);
        let record = self.store.get_record(&key).map_err(to_errno)?;
        if record.name != name {
            warn!(
                parent,
                requested = name,
                stored = %record.name,
                "name hash collision or corrupt record"
            );
            return Err(to_errno(Status::with_message(
                MetaCode::NAME_MISMATCH,
                format!("entry under parent {parent} stores name {:?}", record.name),
            )));
        }
        Ok((key, record))
    }

    /// Resolve a path to the inode number of the directory it names.
    fn resolve_dir(&self, dir_path: &str) -> FsResult<InodeId> {
        let mut ino = ROOT_INODE_ID;
        for component in path::components(dir_path) {
            let (_, record) = self.load_child(ino, component)?;
            if !record.attrs.is_dir() {
                return Err(libc::ENOTDIR);
            }
            ino = record.attrs.ino;
        }
        Ok(ino)
    }

    /// Key of the record storing the directory at `dir_path` itself.
    /// The root's own record lives at the sentinel key.
    fn dir_record_key(&self, dir_path: &str) -> FsResult<InodeKey> {
        let name = path::file_name(dir_path);
        if name.is_empty() {
            return Ok(InodeKey::root());
        }
        let parent = self.resolve_dir(path::parent_dir(dir_path))?;
        Ok(InodeKey::for_entry(parent, name))
    }

    /// Resolve any path to its record's key and current contents.
    fn locate(&self, p: &str) -> FsResult<(InodeKey, InodeRecord)> {
        let name = path::file_name(p);
        if name.is_empty() {
            let key = InodeKey::root();
            let record = self.store.get_record(&key).map_err(to_errno)?;
            return Ok((key, record));
        }
        let parent = self.resolve_dir(path::parent_dir(p))?;
        self.load_child(parent, name)
    }

    /// Common body of `create` and `mkdir`.
    fn create_entry(&self, p: &str, attrs_for: impl FnOnce(InodeId) -> InodeAttrs) -> FsResult<()> {
        let name = path::file_name(p);
        if name.is_empty() {
            return Err(libc::EEXIST);
        }
        let parent = self.resolve_dir(path::parent_dir(p))?;
        let key = InodeKey::for_entry(parent, name);
        if self.store.exists(&key).map_err(to_errno)? {
            return Err(libc::EEXIST);
        }
        let ino = self.state.alloc_ino();
        let record = InodeRecord::new(attrs_for(ino), name);
        self.store.put_record(&key, &record).map_err(to_errno)
    }

    /// Adjust the parent directory's link count after a child directory
    /// is created or removed.
    fn bump_parent_nlink(&self, p: &str, delta: i32) -> FsResult<()> {
        let parent_key = self.dir_record_key(path::parent_dir(p))?;
        self.store
            .update_attrs(&parent_key, |attrs| {
                attrs.nlink = attrs.nlink.saturating_add_signed(delta);
                attrs.mtime = Timespec::now();
            })
            .map_err(to_errno)
    }
}

impl FsOps for MetaFileSystem {
    fn init(&self) -> FsResult<()> {
        info!(
            mountpoint = %self.config.mountpoint,
            meta_dir = %self.config.meta_dir,
            "init"
        );
        if self.state.root_initialized() {
            return Ok(());
        }
        let root_key = InodeKey::root();
        if !self.store.exists(&root_key).map_err(to_errno)? {
            let record = InodeRecord::new(InodeAttrs::root(Timespec::now()), "/");
            self.store.put_record(&root_key, &record).map_err(to_errno)?;
            info!("created root directory record");
        }
        self.state.mark_root_initialized();
        Ok(())
    }

    fn getattr(&self, ctx: &RequestContext, p: &str) -> FsResult<FileAttr> {
        debug!(path = p, pid = ctx.pid, "getattr");
        let (key, mut record) = self.locate(p)?;

        // Access refreshes the timestamps and stamps the caller's
        // identity, then persists the record. A readonly mount serves
        // the stored attributes untouched.
        if !self.config.readonly {
            let now = Timespec::now();
            record.attrs.atime = now;
            record.attrs.mtime = now;
            record.attrs.uid = ctx.uid;
            record.attrs.gid = ctx.gid;
            self.store.put_record(&key, &record).map_err(to_errno)?;
        }

        Ok(FileAttr::from(&record.attrs))
    }

    fn readdir(&self, ctx: &RequestContext, p: &str, fill: &mut DirFiller<'_>) -> FsResult<()> {
        debug!(path = p, pid = ctx.pid, "readdir");
        let dir = self.resolve_dir(p)?;

        fill(".", None);
        fill("..", None);
        for child in self.store.list_children(dir).map_err(to_errno)? {
            fill(&child.name, Some(&FileAttr::from(&child.attrs)));
        }
        Ok(())
    }

    fn create(&self, ctx: &RequestContext, p: &str, mode: u32) -> FsResult<()> {
        debug!(path = p, mode, pid = ctx.pid, "create");
        self.check_readonly()?;
        self.create_entry(p, |ino| {
            InodeAttrs::new_file(ino, mode, ctx.uid, ctx.gid, Timespec::now())
        })
    }

    fn mkdir(&self, ctx: &RequestContext, p: &str, mode: u32) -> FsResult<()> {
        debug!(path = p, mode, pid = ctx.pid, "mkdir");
        self.check_readonly()?;
        self.create_entry(p, |ino| {
            InodeAttrs::new_directory(ino, mode, ctx.uid, ctx.gid, Timespec::now())
        })?;
        // The child's ".." adds a link to the parent.
        self.bump_parent_nlink(p, 1)
    }

    fn utimens(
        &self,
        ctx: &RequestContext,
        p: &str,
        atime: Timespec,
        mtime: Timespec,
    ) -> FsResult<()> {
        debug!(path = p, pid = ctx.pid, "utimens");
        self.check_readonly()?;
        let (key, _) = self.locate(p)?;
        self.store
            .update_attrs(&key, |attrs| {
                attrs.atime = atime;
                attrs.mtime = mtime;
            })
            .map_err(to_errno)
    }

    fn open(&self, ctx: &RequestContext, p: &str, flags: i32) -> FsResult<()> {
        debug!(path = p, flags, pid = ctx.pid, "open");
        self.locate(p)?;
        Ok(())
    }

    fn unlink(&self, ctx: &RequestContext, p: &str) -> FsResult<()> {
        debug!(path = p, pid = ctx.pid, "unlink");
        self.check_readonly()?;
        let (key, record) = self.locate(p)?;
        if record.attrs.is_dir() {
            return Err(libc::EISDIR);
        }
        self.store.delete_record(&key).map_err(to_errno)
    }

    fn rmdir(&self, ctx: &RequestContext, p: &str) -> FsResult<()> {
        debug!(path = p, pid = ctx.pid, "rmdir");
        self.check_readonly()?;
        let (key, record) = self.locate(p)?;
        if !record.attrs.is_dir() {
            return Err(libc::ENOTDIR);
        }
        if record.attrs.ino == ROOT_INODE_ID {
            return Err(libc::EBUSY);
        }
        // Children would become unreachable once the parent entry is
        // gone; the directory must be empty.
        if !self
            .store
            .list_children(record.attrs.ino)
            .map_err(to_errno)?
            .is_empty()
        {
            return Err(libc::ENOTEMPTY);
        }
        self.store.delete_record(&key).map_err(to_errno)?;
        // Removing the child's ".." drops a link from the parent.
        self.bump_parent_nlink(p, -1)
    }

    fn read(&self, ctx: &RequestContext, p: &str, size: usize, offset: u64) -> FsResult<usize> {
        debug!(path = p, size, offset, pid = ctx.pid, "read");
        self.locate(p)?;
        Ok(0)
    }

    fn write(&self, ctx: &RequestContext, p: &str, data: &[u8], offset: u64) -> FsResult<usize> {
        debug!(path = p, size = data.len(), offset, pid = ctx.pid, "write");
        self.check_readonly()?;
        self.locate(p)?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvfs_kv::MemDb;

    fn make_fs() -> MetaFileSystem {
        let store = MetadataStore::new(Arc::new(MemDb::new()));
        let fs = MetaFileSystem::new(store, Arc::new(FsState::new()), FsConfig::default());
        fs.init().unwrap();
        fs
    }

    fn make_readonly_fs() -> MetaFileSystem {
        let store = MetadataStore::new(Arc::new(MemDb::new()));
        let fs = MetaFileSystem::new(store, Arc::new(FsState::new()), FsConfig::default());
        fs.init().unwrap();
        let config = FsConfig {
            readonly: true,
            ..FsConfig::default()
        };
        // Rebuild over the same engine is unnecessary; just flip the flag
        // by constructing a fresh handler around the same store.
        MetaFileSystem {
            store: fs.store,
            state: fs.state,
            registry: fs.registry,
            config,
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            uid: 1000,
            gid: 1000,
            pid: 4242,
        }
    }

    fn list_names(fs: &MetaFileSystem, p: &str) -> Vec<String> {
        let mut names = Vec::new();
        fs.readdir(&ctx(), p, &mut |name, _| names.push(name.to_string()))
            .unwrap();
        names.sort();
        names
    }

    #[test]
    fn test_init_idempotent() {
        let fs = make_fs();
        fs.init().unwrap();
        fs.init().unwrap();

        let attr = fs.getattr(&ctx(), "/").unwrap();
        assert_eq!(attr.ino, ROOT_INODE_ID);
        assert_ne!(attr.mode & libc::S_IFDIR, 0);
    }

    #[test]
    fn test_getattr_missing() {
        let fs = make_fs();
        assert_eq!(fs.getattr(&ctx(), "/nope").unwrap_err(), libc::ENOENT);
    }

    #[test]
    fn test_create_and_getattr() {
        let fs = make_fs();
        fs.create(&ctx(), "/hello.txt", 0o644).unwrap();

        let attr = fs.getattr(&ctx(), "/hello.txt").unwrap();
        assert_ne!(attr.ino, ROOT_INODE_ID);
        assert_eq!(attr.mode & 0o7777, 0o644);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.uid, 1000);
        assert_eq!(attr.size, 0);
    }

    #[test]
    fn test_create_exists() {
        let fs = make_fs();
        fs.create(&ctx(), "/dup", 0o644).unwrap();
        assert_eq!(fs.create(&ctx(), "/dup", 0o644).unwrap_err(), libc::EEXIST);
    }

    #[test]
    fn test_mkdir_bumps_parent_nlink() {
        let fs = make_fs();
        let before = fs.getattr(&ctx(), "/").unwrap().nlink;
        fs.mkdir(&ctx(), "/sub", 0o755).unwrap();

        let attr = fs.getattr(&ctx(), "/sub").unwrap();
        assert_ne!(attr.mode & libc::S_IFDIR, 0);
        assert_eq!(attr.nlink, 2);
        assert_eq!(fs.getattr(&ctx(), "/").unwrap().nlink, before + 1);
    }

    #[test]
    fn test_nested_resolution() {
        let fs = make_fs();
        fs.mkdir(&ctx(), "/a", 0o755).unwrap();
        fs.mkdir(&ctx(), "/a/b", 0o755).unwrap();
        fs.create(&ctx(), "/a/b/deep.txt", 0o600).unwrap();

        let attr = fs.getattr(&ctx(), "/a/b/deep.txt").unwrap();
        assert_eq!(attr.mode & 0o7777, 0o600);

        assert_eq!(list_names(&fs, "/a/b"), vec![".", "..", "deep.txt"]);
    }

    #[test]
    fn test_resolution_through_file_fails() {
        let fs = make_fs();
        fs.create(&ctx(), "/plain", 0o644).unwrap();
        assert_eq!(
            fs.create(&ctx(), "/plain/child", 0o644).unwrap_err(),
            libc::ENOTDIR
        );
    }

    #[test]
    fn test_readdir_root() {
        let fs = make_fs();
        fs.create(&ctx(), "/one", 0o644).unwrap();
        fs.mkdir(&ctx(), "/two", 0o755).unwrap();

        assert_eq!(list_names(&fs, "/"), vec![".", "..", "one", "two"]);
    }

    #[test]
    fn test_readdir_attrs_emitted() {
        let fs = make_fs();
        fs.create(&ctx(), "/f", 0o640).unwrap();

        let mut seen = None;
        fs.readdir(&ctx(), "/", &mut |name, attr| {
            if name == "f" {
                seen = attr.copied();
            }
        })
        .unwrap();
        let attr = seen.expect("child attributes");
        assert_eq!(attr.mode & 0o7777, 0o640);
    }

    #[test]
    fn test_readdir_missing_dir() {
        let fs = make_fs();
        let err = fs
            .readdir(&ctx(), "/nowhere", &mut |_, _| {})
            .unwrap_err();
        assert_eq!(err, libc::ENOENT);
    }

    #[test]
    fn test_unlink() {
        let fs = make_fs();
        fs.create(&ctx(), "/gone", 0o644).unwrap();
        fs.unlink(&ctx(), "/gone").unwrap();
        assert_eq!(fs.getattr(&ctx(), "/gone").unwrap_err(), libc::ENOENT);
        assert_eq!(fs.unlink(&ctx(), "/gone").unwrap_err(), libc::ENOENT);
    }

    #[test]
    fn test_unlink_directory_rejected() {
        let fs = make_fs();
        fs.mkdir(&ctx(), "/d", 0o755).unwrap();
        assert_eq!(fs.unlink(&ctx(), "/d").unwrap_err(), libc::EISDIR);
    }

    #[test]
    fn test_rmdir_drops_parent_nlink() {
        let fs = make_fs();
        fs.mkdir(&ctx(), "/d", 0o755).unwrap();
        let with_child = fs.getattr(&ctx(), "/").unwrap().nlink;

        fs.rmdir(&ctx(), "/d").unwrap();
        assert_eq!(fs.getattr(&ctx(), "/d").unwrap_err(), libc::ENOENT);
        assert_eq!(fs.getattr(&ctx(), "/").unwrap().nlink, with_child - 1);
    }

    #[test]
    fn test_rmdir_non_empty_rejected() {
        let fs = make_fs();
        fs.mkdir(&ctx(), "/d", 0o755).unwrap();
        fs.create(&ctx(), "/d/child", 0o644).unwrap();

        assert_eq!(fs.rmdir(&ctx(), "/d").unwrap_err(), libc::ENOTEMPTY);
        // Both entries survive the rejected removal.
        fs.getattr(&ctx(), "/d/child").unwrap();

        // Emptied, the directory removes cleanly.
        fs.unlink(&ctx(), "/d/child").unwrap();
        fs.rmdir(&ctx(), "/d").unwrap();
        assert_eq!(fs.getattr(&ctx(), "/d").unwrap_err(), libc::ENOENT);
    }

    #[test]
    fn test_rmdir_on_file_rejected() {
        let fs = make_fs();
        fs.create(&ctx(), "/f", 0o644).unwrap();
        assert_eq!(fs.rmdir(&ctx(), "/f").unwrap_err(), libc::ENOTDIR);
    }

    #[test]
    fn test_rmdir_root_rejected() {
        let fs = make_fs();
        assert_eq!(fs.rmdir(&ctx(), "/").unwrap_err(), libc::EBUSY);
    }

    #[test]
    fn test_utimens() {
        let fs = make_fs();
        fs.create(&ctx(), "/t", 0o644).unwrap();

        let atime = Timespec { sec: 111, nsec: 1 };
        let mtime = Timespec { sec: 222, nsec: 2 };
        fs.utimens(&ctx(), "/t", atime, mtime).unwrap();

        // getattr refreshes times, so read the stored record directly.
        let (_, record) = fs.locate("/t").unwrap();
        assert_eq!(record.attrs.atime, atime);
        assert_eq!(record.attrs.mtime, mtime);
    }

    #[test]
    fn test_utimens_missing() {
        let fs = make_fs();
        let now = Timespec::now();
        assert_eq!(
            fs.utimens(&ctx(), "/missing", now, now).unwrap_err(),
            libc::ENOENT
        );
    }

    #[test]
    fn test_open() {
        let fs = make_fs();
        fs.create(&ctx(), "/o", 0o644).unwrap();
        fs.open(&ctx(), "/o", libc::O_RDONLY).unwrap();
        assert_eq!(
            fs.open(&ctx(), "/no", libc::O_RDONLY).unwrap_err(),
            libc::ENOENT
        );
    }

    #[test]
    fn test_read_write_no_effect() {
        let fs = make_fs();
        fs.create(&ctx(), "/rw", 0o644).unwrap();

        assert_eq!(fs.read(&ctx(), "/rw", 4096, 0).unwrap(), 0);
        assert_eq!(fs.write(&ctx(), "/rw", b"payload", 0).unwrap(), 0);
        assert_eq!(fs.getattr(&ctx(), "/rw").unwrap().size, 0);
    }

    #[test]
    fn test_getattr_refreshes_times_and_identity() {
        let fs = make_fs();
        fs.create(&ctx(), "/fresh", 0o644).unwrap();

        let other = RequestContext {
            uid: 7,
            gid: 8,
            pid: 1,
        };
        let attr = fs.getattr(&other, "/fresh").unwrap();
        assert_eq!(attr.uid, 7);
        assert_eq!(attr.gid, 8);

        let (_, record) = fs.locate("/fresh").unwrap();
        assert_eq!(record.attrs.uid, 7);
    }

    #[test]
    fn test_mismatched_stored_name_reads_as_io_fault() {
        let fs = make_fs();
        // Plant a record whose stored name differs from the one hashed
        // into its key, as a collision or corruption would leave it.
        let key = InodeKey::for_entry(ROOT_INODE_ID, "alias");
        let planted = InodeRecord::new(
            InodeAttrs::new_file(9, 0o644, 0, 0, Timespec::now()),
            "original",
        );
        fs.store.put_record(&key, &planted).unwrap();

        assert_eq!(fs.getattr(&ctx(), "/alias").unwrap_err(), libc::EIO);
    }

    #[test]
    fn test_readonly_getattr_serves_stored_attrs() {
        let fs = make_readonly_fs();
        let before = fs.locate("/").unwrap().1;

        let other = RequestContext {
            uid: 7,
            gid: 8,
            pid: 1,
        };
        let attr = fs.getattr(&other, "/").unwrap();
        assert_eq!(attr.uid, before.attrs.uid);
        assert_eq!(attr.mtime, before.attrs.mtime);

        // The stored record is untouched.
        assert_eq!(fs.locate("/").unwrap().1, before);
    }

    #[test]
    fn test_readonly_gates_mutations() {
        let fs = make_readonly_fs();
        let c = ctx();

        assert_eq!(fs.create(&c, "/f", 0o644).unwrap_err(), libc::EROFS);
        assert_eq!(fs.mkdir(&c, "/d", 0o755).unwrap_err(), libc::EROFS);
        assert_eq!(fs.unlink(&c, "/f").unwrap_err(), libc::EROFS);
        assert_eq!(fs.rmdir(&c, "/d").unwrap_err(), libc::EROFS);
        assert_eq!(
            fs.utimens(&c, "/f", Timespec::now(), Timespec::now())
                .unwrap_err(),
            libc::EROFS
        );
        assert_eq!(fs.write(&c, "/f", b"x", 0).unwrap_err(), libc::EROFS);
        // Reads still work.
        fs.getattr(&c, "/").unwrap();
    }

    #[test]
    fn test_registry_reachable_but_unwired() {
        let fs = make_fs();
        let key = fs.registry().handle_entries("/blob").unwrap();
        assert_eq!(fs.registry().handle_entries("/blob").unwrap(), key);
    }

    #[test]
    fn test_concurrent_creates_distinct_inodes() {
        let fs = Arc::new(make_fs());
        let mut handles = Vec::new();
        for i in 0..8 {
            let f = Arc::clone(&fs);
            handles.push(std::thread::spawn(move || {
                f.create(&ctx(), &format!("/c{i}"), 0o644).unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut inos: Vec<u64> = (0..8)
            .map(|i| fs.getattr(&ctx(), &format!("/c{i}")).unwrap().ino)
            .collect();
        inos.sort_unstable();
        inos.dedup();
        assert_eq!(inos.len(), 8);
    }
}
