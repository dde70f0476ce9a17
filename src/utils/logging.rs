//! Logging initialization for Chatline.
//!
//! Supports three formats:
//! - `pretty`: multi-line, human-readable output
//! - `component`: `[timestamp] [LEVEL] target message {fields}`, compact and grep-friendly;
//!   use the [`log_component!`] macro to add a `component` field for per-subsystem filtering
//! - `json`: structured JSON lines for log aggregators, optionally appended to a file

use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ChatlineError, Result};

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// `RUST_LOG` wins over `cfg.level` when set.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let installed = match cfg.format {
        LogFormat::Json => match &cfg.file {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        ChatlineError::Config(format!("Cannot open log file {}: {}", path, e))
                    })?;
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(Arc::new(file) as Arc<File>)
                    .try_init()
            }
            None => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
        },
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .try_init(),
        LogFormat::Component => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init(),
    };

    installed.map_err(|e| ChatlineError::Config(format!("Cannot install logger: {}", e)))
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`).
/// The `component` field makes it easy to grep logs by subsystem:
///
/// ```
/// # use chatline::log_component;
/// log_component!(info, "http", "listening");
/// log_component!(warn, "tools", "slow lookup", elapsed_ms = 2500u64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
