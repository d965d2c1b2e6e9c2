use std::fs;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use kvfs_fuse::{FsConfig, FsOps, MetaFileSystem};
use kvfs_kv::KvEngine;
use kvfs_meta::{FsState, MetadataStore};

/// KVFS Mount Daemon
#[derive(Parser, Debug)]
#[command(name = "kvfs-mount", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kvfs-mount.json")]
    config: String,

    /// Mount point path
    #[arg(short, long)]
    mountpoint: Option<String>,

    /// Metadata store directory
    #[arg(long)]
    meta_dir: Option<String>,

    /// Reject mutating operations
    #[arg(long)]
    readonly: bool,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

fn load_config(args: &Args) -> anyhow::Result<FsConfig> {
    let mut config: FsConfig = match fs::read_to_string(&args.config) {
        Ok(text) => {
            serde_json::from_str(&text).with_context(|| format!("parsing {}", args.config))?
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => FsConfig::default(),
        Err(err) => return Err(err).with_context(|| format!("reading {}", args.config)),
    };

    if let Some(mountpoint) = &args.mountpoint {
        config.mountpoint = mountpoint.clone();
    }
    if let Some(meta_dir) = &args.meta_dir {
        config.meta_dir = meta_dir.clone();
    }
    if args.readonly {
        config.readonly = true;
    }
    Ok(config)
}

#[cfg(feature = "rocksdb")]
fn open_engine(config: &FsConfig) -> anyhow::Result<Arc<dyn KvEngine>> {
    if config.meta_dir.is_empty() {
        info!("no meta_dir configured, using in-memory engine");
        return Ok(Arc::new(kvfs_kv::MemDb::new()));
    }
    let db = kvfs_kv::RocksDb::open(&config.meta_dir)
        .with_context(|| format!("opening metadata store at {}", config.meta_dir))?;
    Ok(Arc::new(db))
}

#[cfg(not(feature = "rocksdb"))]
fn open_engine(config: &FsConfig) -> anyhow::Result<Arc<dyn KvEngine>> {
    if !config.meta_dir.is_empty() {
        info!(
            meta_dir = %config.meta_dir,
            "persistent engine not compiled in, using in-memory engine"
        );
    }
    Ok(Arc::new(kvfs_kv::MemDb::new()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        println!("{}", serde_json::to_string_pretty(&FsConfig::default())?);
        return Ok(());
    }

    let config = load_config(&args)?;
    let _log_guard = kvfs_logging::init_logging(&config.log);

    info!(
        config = %args.config,
        mountpoint = %config.mountpoint,
        readonly = config.readonly,
        "Starting KVFS mount"
    );

    let engine = open_engine(&config)?;
    let store = MetadataStore::new(engine);
    let fs = MetaFileSystem::new(store, Arc::new(FsState::new()), config);
    fs.init()
        .map_err(|errno| anyhow::anyhow!("root bootstrap failed with errno {errno}"))?;

    info!("metadata core ready; this build carries no kernel bridge, exiting");
    Ok(())
}
