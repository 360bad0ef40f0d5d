//! Runtime configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. Explicit `ExecContext::with_config`
//! 2. Environment variables (RESUMABLE_*)
//! 3. Config file (resumable.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use resumable::util::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml_str("[pool]\nenabled = true\n").unwrap();
//! assert!(config.pool.enabled);
//! assert_eq!(config.pool.unit_capacity, 200);
//! ```

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::util::logger::LogLevel;

/// Process-wide default, snapshotted by `ExecContext::new`
static GLOBAL: Lazy<RwLock<RuntimeConfig>> =
    Lazy::new(|| RwLock::new(RuntimeConfig::default().apply_env_overrides()));

/// Top-level runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub coroutine: CoroutineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Object pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Reuse unit shells (adapter pools are always on)
    #[serde(default)]
    pub enabled: bool,
    /// Free-list capacity per unit variant
    #[serde(default = "default_unit_capacity")]
    pub unit_capacity: usize,
    /// Free-list capacity for asend adapters and wrapped values
    #[serde(default = "default_adapter_capacity")]
    pub adapter_capacity: usize,
}

fn default_unit_capacity() -> usize {
    200
}

fn default_adapter_capacity() -> usize {
    80
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            unit_capacity: 200,
            adapter_capacity: 80,
        }
    }
}

/// Coroutine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoroutineConfig {
    /// Call-stack entries recorded as a coroutine's creation origin.
    /// 0 disables origin tracking.
    #[serde(default)]
    pub origin_tracking_depth: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::ParseError)
    }

    /// Serialize as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Overlay `RESUMABLE_POOL_ENABLED`, `RESUMABLE_POOL_CAPACITY` and
    /// `RESUMABLE_ORIGIN_DEPTH`. Unparsable values are ignored.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        if let Some(v) = lookup("RESUMABLE_POOL_ENABLED") {
            match v.trim() {
                "1" | "true" | "on" => self.pool.enabled = true,
                "0" | "false" | "off" => self.pool.enabled = false,
                _ => {}
            }
        }
        if let Some(n) = lookup("RESUMABLE_POOL_CAPACITY").and_then(|v| v.trim().parse().ok()) {
            self.pool.unit_capacity = n;
        }
        if let Some(n) = lookup("RESUMABLE_ORIGIN_DEPTH").and_then(|v| v.trim().parse().ok()) {
            self.coroutine.origin_tracking_depth = n;
        }
        self
    }
}

/// Load a config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    RuntimeConfig::from_toml_str(&content)
}

/// Write a config file
pub fn save_config(
    path: &Path,
    config: &RuntimeConfig,
) -> Result<(), ConfigError> {
    let content = config.to_toml_string()?;
    fs::write(path, content).map_err(ConfigError::IoError)
}

/// Current process-wide configuration
pub fn global() -> RuntimeConfig {
    GLOBAL.read().clone()
}

/// Replace the process-wide configuration. Existing contexts keep the
/// snapshot they were created with.
pub fn set_global(config: RuntimeConfig) {
    *GLOBAL.write() = config;
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests;
