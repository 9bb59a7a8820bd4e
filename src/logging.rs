//! Logging System
//!
//! Structured logging via the `tracing` crate: configurable level, text or
//! JSON format, and stdout/stderr/file destinations.

use crate::error::ControllerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use the platform
    /// state directory
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            modules: HashMap::new(),
        }
    }
}

/// Resolve the log file path: explicit config, `CONFSYNC_LOG_FILE` env, or
/// the platform state directory.
pub fn resolve_log_file_path(config_file: Option<PathBuf>) -> Result<PathBuf, ControllerError> {
    if let Ok(env_path) = std::env::var("CONFSYNC_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    let project_dirs = directories::ProjectDirs::from("", "confsync", "confsync").ok_or_else(
        || ControllerError::Logging("could not determine platform state directory".to_string()),
    )?;
    let state_dir = project_dirs
        .state_dir()
        .ok_or_else(|| {
            ControllerError::Logging("platform state directory not available".to_string())
        })?
        .to_path_buf();
    Ok(state_dir.join("confsync.log"))
}

/// Initialize the logging system.
///
/// The `CONFSYNC_LOG` environment variable overrides the configured filter.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ControllerError> {
    let filter = build_env_filter(config)?;
    let base_subscriber = Registry::default().with(filter);

    let json = match config.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(ControllerError::Logging(format!(
                "invalid log format: {} (must be 'json' or 'text')",
                other
            )))
        }
    };

    if json {
        match config.output.as_str() {
            "stdout" => {
                base_subscriber
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(std::io::stdout),
                    )
                    .init();
            }
            "stderr" => {
                base_subscriber
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            "file" => {
                let file_writer = open_log_file(config)?;
                base_subscriber
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(file_writer),
                    )
                    .init();
            }
            "file+stderr" => {
                let writer = open_log_file(config)?.and(std::io::stderr);
                base_subscriber
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(writer),
                    )
                    .init();
            }
            other => {
                return Err(ControllerError::Logging(format!(
                    "invalid log output: {} (must be 'stdout', 'stderr', 'file', or 'file+stderr')",
                    other
                )))
            }
        }
    } else {
        match config.output.as_str() {
            "stdout" => {
                base_subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(std::io::stdout),
                    )
                    .init();
            }
            "stderr" => {
                base_subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            "file" => {
                let file_writer = open_log_file(config)?;
                base_subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_ansi(false)
                            .with_writer(file_writer),
                    )
                    .init();
            }
            "file+stderr" => {
                let writer = open_log_file(config)?.and(std::io::stderr);
                base_subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init();
            }
            other => {
                return Err(ControllerError::Logging(format!(
                    "invalid log output: {} (must be 'stdout', 'stderr', 'file', or 'file+stderr')",
                    other
                )))
            }
        }
    }

    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, ControllerError> {
    let log_file = resolve_log_file_path(config.file.clone())?;
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ControllerError::Logging(format!("failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| {
            ControllerError::Logging(format!("failed to open log file {:?}: {}", log_file, e))
        })
}

/// Build the environment filter from config or the `CONFSYNC_LOG` variable.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ControllerError> {
    if let Ok(filter) = EnvFilter::try_from_env("CONFSYNC_LOG") {
        return Ok(filter);
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, module_level) in &config.modules {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ControllerError::Logging(format!("invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}
