//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{NodeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub uplink: UplinkConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device identity
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

/// Current sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_sensor_source")]
    pub source: String,

    #[serde(default)]
    pub path: String,

    #[serde(default = "default_mains_voltage")]
    pub mains_voltage: f64,

    #[serde(default = "default_simulated_current_a")]
    pub simulated_current_a: f64,
}

/// Sampling, warm-up and aggregation window
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_stabilization_samples")]
    pub stabilization_samples: u32,
}

/// Remote ingestion endpoint and link handling
#[derive(Debug, Deserialize, Clone)]
pub struct UplinkConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_uplink_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Offline buffer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BufferConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default = "default_restore_on_boot")]
    pub restore_on_boot: bool,
}

/// Display feed configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_rate_per_kwh")]
    pub rate_per_kwh: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

// Default value functions
fn default_device_id() -> String { "b651114b-afdd-4815-876a-c83f22759e64".to_string() }

fn default_sensor_source() -> String { "simulated".to_string() }
fn default_mains_voltage() -> f64 { 230.0 }
fn default_simulated_current_a() -> f64 { 4.35 }

fn default_interval_ms() -> u64 { 1000 }
fn default_window_size() -> usize { 30 }
fn default_stabilization_samples() -> u32 { 10 }

fn default_endpoint() -> String { "http://localhost:8000/api/upload".to_string() }
fn default_uplink_timeout_ms() -> u64 { 10000 }
fn default_reconnect_interval_ms() -> u64 { 30000 }

fn default_capacity() -> usize { 50 }
fn default_snapshot_path() -> PathBuf { PathBuf::from("./energy_data.json") }
fn default_restore_on_boot() -> bool { true }

fn default_rate_per_kwh() -> f64 { 0.245 }

fn default_log_level() -> String { "info".to_string() }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { device_id: default_device_id() }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: default_sensor_source(),
            path: String::new(),
            mains_voltage: default_mains_voltage(),
            simulated_current_a: default_simulated_current_a(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            window_size: default_window_size(),
            stabilization_samples: default_stabilization_samples(),
        }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            timeout_ms: default_uplink_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            snapshot_path: default_snapshot_path(),
            restore_on_boot: default_restore_on_boot(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { rate_per_kwh: default_rate_per_kwh() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl SamplingConfig {
    /// Sampling interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Sampling interval in seconds, used for energy integration
    pub fn interval_secs(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }
}

impl UplinkConfig {
    /// Full upload URL with the access credential as a query parameter
    pub fn upload_url(&self) -> String {
        if self.api_key.is_empty() {
            return self.endpoint.clone();
        }
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}api_key={}", self.endpoint, separator, self.api_key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> NodeError {
    NodeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use watt_node::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.device.device_id.trim().is_empty() {
            return Err(invalid("device_id cannot be empty"));
        }

        match self.sensor.source.as_str() {
            "simulated" => {}
            "file" => {
                if self.sensor.path.is_empty() {
                    return Err(invalid("sensor path cannot be empty when source is 'file'"));
                }
            }
            other => {
                return Err(invalid(format!(
                    "sensor source must be 'simulated' or 'file', got '{}'",
                    other
                )));
            }
        }

        if !(1.0..=480.0).contains(&self.sensor.mains_voltage) {
            return Err(invalid("mains_voltage must be between 1.0 and 480.0"));
        }

        if self.sensor.simulated_current_a < 0.0 {
            return Err(invalid("simulated_current_a cannot be negative"));
        }

        if self.sampling.interval_ms == 0 || self.sampling.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 1 and 60000"));
        }

        if self.sampling.window_size == 0 {
            return Err(invalid("window_size must be greater than 0"));
        }

        if !self.uplink.endpoint.starts_with("http://")
            && !self.uplink.endpoint.starts_with("https://")
        {
            return Err(invalid("endpoint must start with http:// or https://"));
        }

        if self.uplink.timeout_ms == 0 || self.uplink.timeout_ms > 60000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if self.uplink.reconnect_interval_ms == 0 || self.uplink.reconnect_interval_ms > 3_600_000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 3600000"));
        }

        if self.buffer.capacity == 0 {
            return Err(invalid("buffer capacity must be greater than 0"));
        }

        if self.buffer.snapshot_path.as_os_str().is_empty() {
            return Err(invalid("snapshot_path cannot be empty"));
        }

        if self.display.rate_per_kwh < 0.0 {
            return Err(invalid("rate_per_kwh cannot be negative"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}
