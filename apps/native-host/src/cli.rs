//! Command-line arguments of both binaries.

use crate::error::NativeHostError;
use crate::logger::DEFAULT_LOG_LEVEL;

use bridge_core::config::{BridgeConfig, default_config_dir, default_log_dir};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use log::{LevelFilter, warn};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Options shared by the helper and the application.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonArgs {
    /// Directory holding bridge_gui.json
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory for the log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Override the build's default log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

impl CommonArgs {
    pub fn level(&self) -> LevelFilter {
        self.log_level.map_or(DEFAULT_LOG_LEVEL, LevelFilter::from)
    }

    pub fn config_dir(&self) -> Result<PathBuf, NativeHostError> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_config_dir()?),
        }
    }

    /// Resolve the log directory and make sure it exists.
    #[track_caller]
    pub fn prepare_log_dir(&self) -> Result<PathBuf, NativeHostError> {
        let location = ErrorLocation::from(Location::caller());
        let log_dir = match &self.log_dir {
            Some(dir) => dir.clone(),
            None => default_log_dir()?,
        };

        create_dir_all(&log_dir).map_err(|e| NativeHostError::Directory {
            message: format!("Failed to create log directory {}: {e}", log_dir.display()),
            location,
        })?;

        Ok(log_dir)
    }

    /// Load the config, falling back to defaults when it is unusable.
    ///
    /// Call after the logger is up so the fallback is visible.
    pub fn load_config(&self) -> BridgeConfig {
        match self.config_dir() {
            Ok(dir) => BridgeConfig::load_or_default(&dir),
            Err(e) => {
                warn!("No config directory, using defaults: {e}");
                BridgeConfig::default()
            }
        }
    }
}

/// Helper process started by the browser for the extension's native port.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct HostArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Whatever the browser appends: extension origin, manifest path,
    /// `--parent-window=<id>` on Windows
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "BROWSER_ARGS")]
    pub browser_args: Vec<String>,
}

/// Application that listens for browser commands.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
