//! # Current Sensors
//!
//! Sources of RMS current (amps). The RMS conversion itself happens in the
//! sensing hardware or an external sampler; this module only reads the
//! resulting value and converts it to power.

use std::fs;
use std::path::PathBuf;

use crate::config::SensorConfig;
use crate::error::{NodeError, Result};

/// Source of RMS current readings
pub trait CurrentSensor: Send {
    /// Reads the current RMS value in amps
    fn read_irms(&mut self) -> Result<f64>;
}

/// Instantaneous power (kW) from RMS current and mains voltage
///
/// # Examples
///
/// ```
/// use watt_node::sampling::power_kw;
///
/// assert_eq!(power_kw(10.0, 230.0), 2.3);
/// ```
#[must_use]
pub fn power_kw(irms: f64, mains_voltage: f64) -> f64 {
    irms * mains_voltage / 1000.0
}

/// Deterministic synthetic load for running without hardware.
///
/// Cycles through a fixed profile around `base_current_a`, resembling a
/// household load with an appliance switching on and off.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    base_current_a: f64,
    tick: u64,
}

/// Multipliers applied to the base current, one per sample
const LOAD_PROFILE: [f64; 12] = [1.0, 1.02, 0.98, 1.05, 1.6, 1.62, 1.58, 1.6, 1.0, 0.97, 1.01, 0.99];

impl SimulatedSensor {
    #[must_use]
    pub fn new(base_current_a: f64) -> Self {
        Self { base_current_a, tick: 0 }
    }
}

impl CurrentSensor for SimulatedSensor {
    fn read_irms(&mut self) -> Result<f64> {
        let factor = LOAD_PROFILE[(self.tick % LOAD_PROFILE.len() as u64) as usize];
        self.tick += 1;
        Ok(self.base_current_a * factor)
    }
}

/// Reads a decimal amps value from a file on every sample.
#[derive(Debug, Clone)]
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CurrentSensor for FileSensor {
    fn read_irms(&mut self) -> Result<f64> {
        let contents = fs::read_to_string(&self.path)?;
        let value: f64 = contents.trim().parse().map_err(|e| {
            NodeError::Sensor(format!(
                "Invalid current value in {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if !value.is_finite() || value < 0.0 {
            return Err(NodeError::Sensor(format!("Current out of range: {}", value)));
        }
        Ok(value)
    }
}

/// Builds the sensor selected by configuration.
pub fn from_config(config: &SensorConfig) -> Box<dyn CurrentSensor> {
    match config.source.as_str() {
        "file" => Box::new(FileSensor::new(&config.path)),
        _ => Box::new(SimulatedSensor::new(config.simulated_current_a)),
    }
}
