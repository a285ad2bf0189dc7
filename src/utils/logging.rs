//! Logging Module
//!
//! Structured logging via the `tracing` crate. The training job logs to two
//! destinations: standard output and an append-only plain-text file inside
//! the log directory (`log_train.txt`), both carrying the same lines.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::utils::error::Result;

/// Name of the plain-text log file inside the log directory.
pub const LOG_FILE_NAME: &str = "log_train.txt";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to emit.
    pub level: Level,
    /// Whether to use ANSI colors on stdout.
    pub ansi_colors: bool,
    /// Optional append-only log file mirroring stdout.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            ansi_colors: true,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Mirror log lines into `log_train.txt` under the given directory.
    pub fn with_log_dir(mut self, dir: &Path) -> Self {
        self.log_file = Some(dir.join(LOG_FILE_NAME));
        self
    }
}

/// Initialize logging with the given configuration.
///
/// The file layer opens the log file in append mode and writes without ANSI
/// escapes; every event is flushed as it is written.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let stdout_layer = fmt::layer()
        .with_ansi(config.ansi_colors)
        .with_target(false)
        .compact();

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            config.level,
        ))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_with_log_dir_appends_file_name() {
        let config = LogConfig::default().with_log_dir(Path::new("/tmp/run"));
        assert_eq!(
            config.log_file.as_deref(),
            Some(Path::new("/tmp/run/log_train.txt"))
        );
    }

    #[test]
    fn test_init_logging_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::default().with_log_dir(dir.path());
        init_logging(&config).unwrap();
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }
}
