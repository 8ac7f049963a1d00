//! # Upload Payload
//!
//! One JSON object per delivery attempt:
//!
//! ```text
//! { "time": "...", "device_id": "...", "power_kw": 1.2, "energy_kwh": 0.01 }
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::reading::Reading;

/// Wire form of a reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadPayload<'a> {
    pub time: &'a str,
    pub device_id: &'a str,
    pub power_kw: f64,
    pub energy_kwh: f64,
}

impl<'a> UploadPayload<'a> {
    pub fn new(reading: &'a Reading, device_id: &'a str) -> Self {
        Self {
            time: &reading.timestamp,
            device_id,
            power_kw: reading.power_kw,
            energy_kwh: reading.energy_kwh,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
