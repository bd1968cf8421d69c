//! Logger setup shared by the `txbench` binaries.
//!
//! Logs always go to stdout and, unless disabled, to a file in the logs directory.

use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Error while creating the logs directory: {0}")]
    Directory(io::Error),
    #[error("Error while opening the log file: {0}")]
    File(io::Error),
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}

pub fn default_logs_path() -> String {
    "logs/".to_owned()
}

pub fn default_logs_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S%.3f".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct LogConfig {
    /// Set log level
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t))]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[cfg_attr(feature = "clap", clap(long, value_enum))]
    #[serde(default)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the usage of colors in log
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    ///
    /// By default it is the name of the running binary followed by `.log`.
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub filename_log: Option<String>,
    /// Logs directory
    ///
    /// By default it will be logs/ of the current directory.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_path()))]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Change the datetime format used by the logger
    #[cfg_attr(feature = "clap", clap(long, default_value_t = default_logs_datetime_format()))]
    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            file_log_level: None,
            disable_file_logging: false,
            disable_log_color: false,
            filename_log: None,
            logs_path: default_logs_path(),
            datetime_format: default_logs_datetime_format(),
        }
    }
}

impl LogConfig {
    // Level used for the log file
    pub fn effective_file_level(&self) -> LogLevel {
        self.file_log_level.unwrap_or(self.log_level)
    }

    // Log filename, falling back on the binary name
    pub fn log_filename(&self, app_name: &str) -> String {
        self.filename_log
            .clone()
            .unwrap_or_else(|| format!("{}.log", app_name))
    }
}

// Install the global logger
// This can only be called once per process
pub fn init_logger(config: &LogConfig, app_name: &str) -> Result<(), LoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    let use_colors = !config.disable_log_color;
    let datetime_format = config.datetime_format.clone();
    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = Local::now().format(&datetime_format);
            if use_colors {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    now,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    now,
                    record.level(),
                    record.target(),
                    message
                ))
            }
        })
        .level(config.log_level.into())
        .chain(io::stdout());

    let mut dispatch = fern::Dispatch::new()
        // mio is too verbose at trace level
        .level_for("mio", LevelFilter::Warn)
        .chain(console);

    if !config.disable_file_logging {
        let dir = Path::new(&config.logs_path);
        fs::create_dir_all(dir).map_err(LoggerError::Directory)?;

        let datetime_format = config.datetime_format.clone();
        let file = fern::log_file(dir.join(config.log_filename(app_name)))
            .map_err(LoggerError::File)?;
        let file_dispatch = fern::Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    Local::now().format(&datetime_format),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(config.effective_file_level().into())
            .chain(file);

        dispatch = dispatch.chain(file_dispatch);
    }

    dispatch.apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::Off);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::Info);
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::Trace);
    }

    #[test]
    fn test_file_level_fallback() {
        let mut config = LogConfig {
            log_level: LogLevel::Debug,
            ..Default::default()
        };
        assert_eq!(config.effective_file_level(), LogLevel::Debug);

        config.file_log_level = Some(LogLevel::Warn);
        assert_eq!(config.effective_file_level(), LogLevel::Warn);
    }

    #[test]
    fn test_filename_fallback() {
        let mut config = LogConfig::default();
        assert_eq!(config.log_filename("txbench"), "txbench.log");

        config.filename_log = Some("custom.log".to_owned());
        assert_eq!(config.log_filename("txbench"), "custom.log");
    }

    #[test]
    fn test_serde_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"log_level":"debug"}"#).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.logs_path, default_logs_path());
        assert!(!config.disable_file_logging);
    }
}
