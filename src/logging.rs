//! tracing setup. The terminal belongs to the UI, so log lines go to a file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub path: PathBuf,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    pub with_target: bool,
}

impl LoggingConfig {
    pub fn new(path: PathBuf) -> Self {
        Self { path, default_filter: "info".to_string(), with_target: false }
    }

    /// Debug output for this crate, targets included.
    pub fn development(path: PathBuf) -> Self {
        Self { path, default_filter: "info,socialspace=debug".to_string(), with_target: true }
    }
}

pub fn init(config: &LoggingConfig) -> AppResult<()> {
    let file = OpenOptions::new().create(true).append(true).open(&config.path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(config.with_target)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("logging: {}", e)))?;

    tracing::info!(path = %config.path.display(), "Logging initialized");
    Ok(())
}
