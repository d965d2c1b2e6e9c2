//! kvfs-meta: filesystem metadata persisted in an ordered KV store.
//!
//! Every filesystem entry is one record in the backing engine. The key is
//! the fixed-width encoding of `(parent inode id, name hash)` and the value
//! is a fixed attribute header followed by the entry name, so listing a
//! directory is a single forward range scan over the parent's key prefix.

pub mod codec;
pub mod fs_state;
pub mod path;
pub mod registry;
pub mod store;

pub use codec::{
    name_hash, InodeAttrs, InodeId, InodeKey, InodeRecord, Timespec, ROOT_INODE_ID,
};
pub use fs_state::FsState;
pub use registry::KeyRegistry;
pub use store::MetadataStore;
