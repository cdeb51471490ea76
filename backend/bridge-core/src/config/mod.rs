//! Bridge configuration, shared by the application and the helper process.
//!
//! Stored as `bridge_gui.json` in the config directory. Every field has a
//! default, so a missing file or a partial document still loads.

use crate::error::config::ConfigError;
use crate::primary::TASK_CAPACITY;
use crate::queue::QueueSpec;
use crate::{
    CONFIG_FILE_NAME, MESSAGE_PRIORITY, MESSAGE_SIZE, PRIORITY_LIMIT, QUEUE_CAPACITY,
    QUEUE_NAME_PREFIX,
};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_VERSION: u32 = 1;
const APP_DIR_NAME: &str = "browser-bridge";

/// Largest message size accepted; the Linux default `msgsize_max`.
pub const MAX_MESSAGE_SIZE_LIMIT: usize = 8192;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            capacity: default_capacity(),
            max_message_size: default_max_message_size(),
            priority: default_priority(),
        }
    }
}

impl QueueConfig {
    pub fn spec(&self) -> QueueSpec {
        QueueSpec {
            capacity: self.capacity,
            max_message_size: self.max_message_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// `null` makes the receiver block without timeout.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default = "default_task_capacity")]
    pub task_capacity: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            task_capacity: default_task_capacity(),
        }
    }
}

impl ReceiverConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl HostConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub host: HostConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            queue: QueueConfig::default(),
            receiver: ReceiverConfig::default(),
            host: HostConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_name_prefix() -> String {
    QUEUE_NAME_PREFIX.to_string()
}
fn default_capacity() -> usize {
    QUEUE_CAPACITY
}
fn default_max_message_size() -> usize {
    MESSAGE_SIZE
}
fn default_priority() -> u32 {
    MESSAGE_PRIORITY
}
fn default_poll_interval_ms() -> Option<u64> {
    Some(250)
}
fn default_task_capacity() -> usize {
    TASK_CAPACITY
}
fn default_idle_timeout_secs() -> u64 {
    10
}

// ============================================
// IMPLEMENTATION
// ============================================

/// Per-user config directory for the bridge.
#[track_caller]
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| ConfigError::NoDirectory {
            message: "no per-user config directory on this platform".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// Per-user log directory for the bridge.
#[track_caller]
pub fn default_log_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
        .ok_or_else(|| ConfigError::NoDirectory {
            message: "no per-user data directory on this platform".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}

impl BridgeConfig {
    /// Load config from `{config_dir}/bridge_gui.json`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(BridgeConfig)` if loaded successfully or defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::Read {
                path: config_path.clone(),
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            }
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::Parse {
                path: config_path.clone(),
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Load config, falling back to defaults on any error.
    pub fn load_or_default(config_dir: &Path) -> Self {
        Self::load(config_dir).unwrap_or_else(|e| {
            warn!("Using default config: {e}");
            Self::default()
        })
    }

    /// Save config to `{config_dir}/bridge_gui.json` using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation,
    /// serialization, write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir)
            .map_err(|e| ConfigError::write(config_dir.to_path_buf(), e))?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::write(temp_path.clone(), e))?;

        std::fs::rename(&temp_path, &config_path)
            .map_err(|e| ConfigError::write(config_path.clone(), e))?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any value is out of range.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let location = ErrorLocation::from(Location::caller());
        let invalid = |message: String| ConfigError::Invalid { message, location };

        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        let prefix = &self.queue.name_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(format!(
                "Invalid queue name prefix: '{prefix}' (use letters, digits, '_')"
            )));
        }

        if self.queue.capacity == 0 {
            return Err(invalid("Queue capacity must be at least 1".to_string()));
        }

        let size = self.queue.max_message_size;
        if size == 0 || size > MAX_MESSAGE_SIZE_LIMIT {
            return Err(invalid(format!(
                "Invalid max_message_size: {size} (must be 1-{MAX_MESSAGE_SIZE_LIMIT})"
            )));
        }

        if self.queue.priority >= PRIORITY_LIMIT {
            return Err(invalid(format!(
                "Invalid priority: {} (must be below {PRIORITY_LIMIT})",
                self.queue.priority
            )));
        }

        if self.receiver.poll_interval_ms == Some(0) {
            return Err(invalid(
                "poll_interval_ms must be positive or null".to_string(),
            ));
        }

        if self.receiver.task_capacity == 0 {
            return Err(invalid("task_capacity must be at least 1".to_string()));
        }

        if self.host.idle_timeout_secs == 0 {
            return Err(invalid("idle_timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}
