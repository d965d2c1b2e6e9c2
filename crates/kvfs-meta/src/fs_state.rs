//! Long-lived per-mount state: inode number allocation and root bootstrap.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::codec::{InodeId, ROOT_INODE_ID};

/// Shared mutable state for one mounted filesystem instance.
///
/// Owned by the filesystem handler and passed by handle into every
/// operation; nothing here is ambient or global.
pub struct FsState {
    /// Next inode number to hand out. Id 0 is the root sentinel.
    next_ino: AtomicU64,
    root_initialized: AtomicBool,
}

impl FsState {
    pub fn new() -> Self {
        Self {
            next_ino: AtomicU64::new(ROOT_INODE_ID + 1),
            root_initialized: AtomicBool::new(false),
        }
    }

    /// Allocate a fresh inode number.
    pub fn alloc_ino(&self) -> InodeId {
        self.next_ino.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether the root record bootstrap has run.
    pub fn root_initialized(&self) -> bool {
        self.root_initialized.load(Ordering::Acquire)
    }

    /// Mark the root record bootstrap complete. Returns false if it was
    /// already marked, so only one caller performs the bootstrap.
    pub fn mark_root_initialized(&self) -> bool {
        !self.root_initialized.swap(true, Ordering::AcqRel)
    }
}

impl Default for FsState {
    fn default() -> Self {
        Self::new()
    }
}
