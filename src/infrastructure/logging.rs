//! Logging system configuration and initialization
//!
//! This module provides the logging setup for harvest runs:
//! - Console output for interactive use
//! - Rolling file output stored relative to the executable
//! - Per-module filter directives to quiet noisy dependencies
//! - Configuration file based log level control

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize the logging system from a [`LoggingConfig`].
///
/// `RUST_LOG` takes precedence over the configured level so operators can
/// raise verbosity without editing the config file.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
    });

    let file_layer = if config.file_output {
        let log_dir = config.directory.clone().unwrap_or_else(get_log_directory);
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

        let appender = rolling::daily(&log_dir, format!("{}.log", config.file_name_prefix));
        let (writer, guard) = non_blocking(appender);
        // The guard must outlive the subscriber or buffered lines are lost.
        if let Ok(mut guards) = LOG_GUARDS.lock() {
            guards.push(guard);
        }

        Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
    } else {
        None
    };

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    info!("✅ Logging initialized (level: {})", config.level);
    if config.file_output {
        let log_dir = config.directory.clone().unwrap_or_else(get_log_directory);
        info!("📁 Log files: {:?}", log_dir.join(format!("{}.log", config.file_name_prefix)));
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    for directive in &config.module_filters {
        match directive.parse() {
            Ok(parsed) => filter = filter.add_directive(parsed),
            Err(e) => tracing::warn!("Ignoring invalid log filter '{}': {}", directive, e),
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses_all_directives() {
        let config = LoggingConfig::default();
        let filter = build_env_filter(&config).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("chromiumoxide"));
        assert!(rendered.contains("reqwest"));
    }

    #[test]
    fn log_directory_is_under_executable() {
        let dir = get_log_directory();
        assert!(dir.ends_with("logs"));
    }
}
