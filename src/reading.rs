//! # Delivery Records
//!
//! A [`Reading`] is one period summary stamped with the time it was minted.
//! It is the unit of delivery: uploaded as-is or held in the offline buffer.

use serde::{Deserialize, Serialize};

use crate::sampling::PeriodSample;

/// One delivery record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// ISO-8601 timestamp (or the placeholder sentinel)
    pub timestamp: String,
    /// Period-average power (kW)
    pub power_kw: f64,
    /// Period energy total (kWh)
    pub energy_kwh: f64,
}

impl Reading {
    pub fn new(timestamp: impl Into<String>, power_kw: f64, energy_kwh: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            power_kw,
            energy_kwh,
        }
    }

    /// Stamps a completed period with `timestamp`.
    pub fn from_period(timestamp: impl Into<String>, period: &PeriodSample) -> Self {
        Self::new(timestamp, period.average_power_kw, period.total_energy_kwh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_period() {
        let period = PeriodSample {
            average_power_kw: 1.5,
            total_energy_kwh: 0.0125,
        };
        let reading = Reading::from_period("2025-01-01T00:00:30+00:00", &period);
        assert_eq!(reading.power_kw, 1.5);
        assert_eq!(reading.energy_kwh, 0.0125);
        assert_eq!(reading.timestamp, "2025-01-01T00:00:30+00:00");
    }

    #[test]
    fn test_snapshot_field_names() {
        let reading = Reading::new("t", 1.0, 2.0);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["timestamp"], "t");
        assert_eq!(json["power_kw"], 1.0);
        assert_eq!(json["energy_kwh"], 2.0);
    }
}
