// SPDX-License-Identifier: Apache-2.0

//! Application configuration
//!
//! Resolution order: built-in defaults, then `<data_dir>/iqpass.json`, then
//! `IQPASS_*` environment variables (a `.env` file in the working directory
//! is honoured).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::keychain::DEFAULT_SERVICE;

pub const CONFIG_FILE: &str = "iqpass.json";

pub const ENV_DATA_DIR: &str = "IQPASS_DATA_DIR";
pub const ENV_STORAGE: &str = "IQPASS_STORAGE";
pub const ENV_KEYRING_SERVICE: &str = "IQPASS_KEYRING_SERVICE";
pub const ENV_POLL_INTERVAL_MS: &str = "IQPASS_POLL_INTERVAL_MS";
pub const ENV_SIMULATED_LATENCY_MS: &str = "IQPASS_SIMULATED_LATENCY_MS";
pub const ENV_LOG: &str = "IQPASS_LOG";

/// Where entitlement keys are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Keyring,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::File
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            other => Err(ConfigError::InvalidValue {
                key: ENV_STORAGE,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    pub keyring_service: String,
    /// How often a mounted route guard re-reads the store to catch writes
    /// made by other processes.
    pub poll_interval_ms: u64,
    /// Artificial delay before a simulated payment completes.
    pub simulated_latency_ms: u64,
    pub login_route: String,
    pub purchase_route: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            data_dir: default_data_dir(),
            keyring_service: DEFAULT_SERVICE.to_string(),
            poll_interval_ms: 1000,
            simulated_latency_ms: 1500,
            login_route: "/login".to_string(),
            purchase_route: "/checkout".to_string(),
            log_filter: "iqpass=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(ENV_DATA_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let mut config = match Self::from_dir(&data_dir) {
            Ok(Some(config)) => {
                info!("Loaded configuration from {:?}", data_dir.join(CONFIG_FILE));
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring config file in {:?}: {}", data_dir, e);
                Self::default()
            }
        };
        config.data_dir = data_dir;
        config.apply_overrides(lookup);
        config
    }

    /// Reads `<dir>/iqpass.json`, `Ok(None)` when the file does not exist.
    pub fn from_dir(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.data_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(self.data_dir.join(CONFIG_FILE), content)?;
        debug!("Saved configuration to {:?}", self.data_dir);
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_STORAGE) {
            match value.parse() {
                Ok(storage) => self.storage = storage,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(value) = lookup(ENV_KEYRING_SERVICE).filter(|v| !v.trim().is_empty()) {
            self.keyring_service = value;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            match parse_millis(ENV_POLL_INTERVAL_MS, &value) {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(value) = lookup(ENV_SIMULATED_LATENCY_MS) {
            match parse_millis(ENV_SIMULATED_LATENCY_MS, &value) {
                Ok(ms) => self.simulated_latency_ms = ms,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(value) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_filter = value;
        }
    }

    /// `None` disables polling.
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("IQPass");
    }
    let mut path = dirs::home_dir().unwrap_or_default();
    path.push(".iqpass");
    path
}
