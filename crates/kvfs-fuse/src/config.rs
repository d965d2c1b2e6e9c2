//! Filesystem configuration.

use kvfs_logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Mount-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Filesystem mount point.
    #[serde(default)]
    pub mountpoint: String,

    /// Directory holding the metadata store.
    #[serde(default)]
    pub meta_dir: String,

    /// Directory reserved for file content storage.
    #[serde(default)]
    pub data_dir: String,

    /// Size boundary in bytes between inline and external file content.
    #[serde(default = "default_data_threshold")]
    pub data_threshold: u64,

    /// Whether the filesystem rejects mutating operations.
    #[serde(default)]
    pub readonly: bool,

    /// Whether to pass `-o allow_other` to the bridge.
    #[serde(default = "default_true")]
    pub allow_other: bool,

    /// Whether the bridge dispatches single-threaded.
    #[serde(default = "default_true")]
    pub single_threaded: bool,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_data_threshold() -> u64 {
    4096
}

fn default_true() -> bool {
    true
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            mountpoint: String::new(),
            meta_dir: String::new(),
            data_dir: String::new(),
            data_threshold: default_data_threshold(),
            readonly: false,
            allow_other: default_true(),
            single_threaded: default_true(),
            log: LogConfig::default(),
        }
    }
}
