//! Structured logging setup
//!
//! Evaluation runs log through `tracing`: per-block SER at `info`, training
//! losses and augmentation sizes at `debug`, skipped NaN steps at `warn`.
//! `RUST_LOG` overrides the configured level.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as tfmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Machine-readable, one JSON object per event
    Json,
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directive string such as `online_detector=debug,channel_dataset=info`
    pub filter: Option<String>,
    pub thread_names: bool,
}

impl LogConfig {
    /// Verbose pretty output with thread names, for trial sweeps
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            thread_names: true,
            ..Default::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
        }
    }
}

/// Install the global subscriber; later calls are ignored
pub fn init_logging(config: &LogConfig) {
    let filter = config.env_filter();

    let result = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(filter)
                .with(tfmt::layer().json().with_thread_names(config.thread_names)),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(filter)
                .with(tfmt::layer().pretty().with_thread_names(config.thread_names)),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(filter)
                .with(tfmt::layer().compact().with_thread_names(config.thread_names)),
        ),
    };

    // already installed
    let _ = result;
}
