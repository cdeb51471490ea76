use common::ErrorLocation;

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

/// Failures around `bridge_gui.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Directory Error: {message} {location}")]
    NoDirectory {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Read Error: {}: {message} {location}", path.display())]
    Read {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    /// The file exists but is not a `BridgeConfig`.
    #[error("Config Parse Error: {}: {message} {location}", path.display())]
    Parse {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Write Error: {}: {message} {location}", path.display())]
    Write {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Config Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },

    /// A value is out of range; see [`crate::config::BridgeConfig::validate`].
    #[error("Config Invalid Error: {message} {location}")]
    Invalid {
        message: String,
        location: ErrorLocation,
    },
}

impl ConfigError {
    #[track_caller]
    pub(crate) fn write(path: PathBuf, source: IoError) -> Self {
        ConfigError::Write {
            path,
            message: source.to_string(),
            location: ErrorLocation::caller(),
            source,
        }
    }
}
