//! # Host Configuration
//!
//! One TOML file configures the scan, the device link, the optional echo
//! front-end and logging. Every section and field has a default.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [scan]
//! x_range = 130
//! ratio = [4, 3]
//! quality = 4
//! order = ["y", "x"]
//!
//! [device]
//! serial = "/dev/ttyUSB0"
//! baud = 115200
//! simulate = false
//! ack_timeout_ms = 30000
//!
//! [server]
//! host = "0.0.0.0"
//! port = 9000
//!
//! [log]
//! level = "debug"
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use stage_scan::config::AppConfig;
//! let config: AppConfig = toml::from_str("[scan]\nquality = 2\n").unwrap();
//! assert_eq!(config.scan.quality, 2);
//! assert_eq!(config.device.baud, 115200);
//! assert!(config.server.is_none());
//! ```

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::scan::config::{Axis, ScanConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("x_range and y_range are both zero")]
    EmptyScanArea,
    #[error("{axis} range must not be negative, got {value}")]
    NegativeRange { axis: Axis, value: String },
    #[error("Aspect ratio components must be positive, got {0}:{1}")]
    InvalidRatio(u32, u32),
    #[error("Quality must be at least 1, got {0}")]
    InvalidQuality(u32),
    #[error("Axis order names {0} twice")]
    DuplicateAxis(Axis),
    #[error("{name} must be positive, got {value}")]
    InvalidFeed { name: &'static str, value: String },
}

/// Main configuration struct for the scan host.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

/// Stage controller link.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub serial: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Replace the serial port with a controller that acknowledges everything
    #[serde(default)]
    pub simulate: bool,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_unlock_timeout_ms")]
    pub unlock_timeout_ms: u64,
    /// Unset means wait for every acknowledgment indefinitely
    #[serde(default)]
    pub ack_timeout_ms: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: "".to_string(),
            baud: default_baud(),
            simulate: false,
            startup_delay_ms: default_startup_delay_ms(),
            unlock_timeout_ms: default_unlock_timeout_ms(),
            ack_timeout_ms: None,
        }
    }
}

impl DeviceConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn unlock_timeout(&self) -> Duration {
        Duration::from_millis(self.unlock_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }
}

/// Echo front-end; absent means no server is started.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_baud() -> u32 { 115200 }
fn default_startup_delay_ms() -> u64 { 3000 }
fn default_unlock_timeout_ms() -> u64 { 500 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_log_level() -> String { "info".to_string() }

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}
