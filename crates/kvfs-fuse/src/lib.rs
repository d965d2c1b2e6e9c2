//! kvfs-fuse: bridge-facing handler layer.
//!
//! [`FsOps`] is the operation contract the OS bridge dispatches into;
//! [`MetaFileSystem`] implements it over the metadata store. Operations
//! are path-based and synchronous, returning positive errno values on
//! failure.

pub mod config;
pub mod filesystem;
pub mod ops;

pub use config::FsConfig;
pub use filesystem::MetaFileSystem;
pub use ops::{FileAttr, FsOps, FsResult, RequestContext};
