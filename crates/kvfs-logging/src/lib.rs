use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for log files. If None, console only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    /// Log rotation: "hourly", "daily", "never".
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_prefix() -> String {
    "kvfs".into()
}

fn default_rotation() -> String {
    "daily".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: default_rotation(),
        }
    }
}

/// Initialize the logging system; call once at program startup.
///
/// `RUST_LOG` overrides the configured level. The returned guard must stay
/// alive for the life of the program so the non-blocking file writer
/// flushes on exit.
pub fn init_logging(config: &LogConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard): (
        Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>>,
        Option<tracing_appender::non_blocking::WorkerGuard>,
    ) = match &config.log_dir {
        Some(log_dir) => {
            let rotation = match config.rotation.as_str() {
                "hourly" => rolling::Rotation::HOURLY,
                "never" => rolling::Rotation::NEVER,
                _ => rolling::Rotation::DAILY,
            };
            let appender = rolling::RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(log_dir)
                .expect("failed to create rolling file appender");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(Box::new(fmt::layer().with_ansi(false).with_writer(non_blocking))),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
