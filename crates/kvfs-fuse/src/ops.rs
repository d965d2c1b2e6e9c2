//! Handler operation contract.

use kvfs_meta::{InodeAttrs, Timespec};

/// Handler results carry a positive errno on failure; the bridge negates
/// at its own boundary.
pub type FsResult<T> = std::result::Result<T, i32>;

/// Per-call identity supplied by the bridge.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

/// Attribute reply assembled from a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
}

impl From<&InodeAttrs> for FileAttr {
    fn from(attrs: &InodeAttrs) -> Self {
        Self {
            ino: attrs.ino,
            mode: attrs.mode,
            nlink: attrs.nlink,
            uid: attrs.uid,
            gid: attrs.gid,
            size: attrs.size,
            atime: attrs.atime,
            mtime: attrs.mtime,
            ctime: attrs.ctime,
        }
    }
}

/// Directory listing callback: entry name plus attributes where the
/// listing has them ("." and ".." are emitted without).
pub type DirFiller<'a> = dyn FnMut(&str, Option<&FileAttr>) + 'a;

/// The operation set the bridge dispatches into.
///
/// All paths are absolute and slash-separated. Implementations must be
/// shareable across concurrent caller threads.
pub trait FsOps: Send + Sync {
    /// One-time bootstrap when the filesystem comes up.
    fn init(&self) -> FsResult<()>;

    /// Fetch entry attributes.
    fn getattr(&self, ctx: &RequestContext, path: &str) -> FsResult<FileAttr>;

    /// Enumerate a directory, emitting each entry through `fill`.
    fn readdir(&self, ctx: &RequestContext, path: &str, fill: &mut DirFiller<'_>) -> FsResult<()>;

    /// Create a regular file.
    fn create(&self, ctx: &RequestContext, path: &str, mode: u32) -> FsResult<()>;

    /// Create a directory.
    fn mkdir(&self, ctx: &RequestContext, path: &str, mode: u32) -> FsResult<()>;

    /// Set access and modification times.
    fn utimens(&self, ctx: &RequestContext, path: &str, atime: Timespec, mtime: Timespec)
        -> FsResult<()>;

    /// Open an existing entry.
    fn open(&self, ctx: &RequestContext, path: &str, flags: i32) -> FsResult<()>;

    /// Remove a file entry.
    fn unlink(&self, ctx: &RequestContext, path: &str) -> FsResult<()>;

    /// Remove a directory entry.
    fn rmdir(&self, ctx: &RequestContext, path: &str) -> FsResult<()>;

    /// Read file data. The metadata core carries no file content; this
    /// reports zero bytes read.
    fn read(&self, ctx: &RequestContext, path: &str, size: usize, offset: u64) -> FsResult<usize>;

    /// Write file data. As with `read`, a success-no-effect placeholder.
    fn write(&self, ctx: &RequestContext, path: &str, data: &[u8], offset: u64) -> FsResult<usize>;
}
