//! # Display Feed
//!
//! Pull-based view of the most recent readings for a local status display.
//!
//! Two views are supported:
//! - **Daily view**: energy accumulated since boot and its cost at the
//!   configured tariff. The meter spans 0-20 kWh.
//! - **Current view**: the latest period's average power and the tariff.
//!   The meter spans 0-1 kW.
//!
//! Until the first reading exists the feed reports a loading state.

use crate::reading::Reading;

/// Daily energy that fills the meter in daily view (kWh)
const DAILY_METER_FULL_KWH: f64 = 20.0;

/// Power that fills the meter in current view (kW)
const CURRENT_METER_FULL_KW: f64 = 1.0;

/// Meter colour band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterLevel {
    /// Below 50%
    Low,
    /// 50% up to 80%
    Moderate,
    /// 80% and above
    High,
}

impl MeterLevel {
    fn from_percent(percent: u8) -> Self {
        match percent {
            0..=49 => MeterLevel::Low,
            50..=79 => MeterLevel::Moderate,
            _ => MeterLevel::High,
        }
    }
}

/// Values the display renders for one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub primary: String,
    pub secondary: String,
    /// Meter fill, 0-100
    pub meter_percent: u8,
    pub meter_level: MeterLevel,
}

/// Latest-reading snapshot for the status display
#[derive(Debug, Clone)]
pub struct DisplayFeed {
    rate_per_kwh: f64,
    daily_view: bool,
    latest: Option<Reading>,
    energy_since_boot_kwh: f64,
    periods_since_boot: u64,
}

impl DisplayFeed {
    /// Creates a feed in daily view with nothing recorded yet.
    ///
    /// # Arguments
    ///
    /// * `rate_per_kwh` - Tariff used for the cost figure
    #[must_use]
    pub fn new(rate_per_kwh: f64) -> Self {
        Self {
            rate_per_kwh,
            daily_view: true,
            latest: None,
            energy_since_boot_kwh: 0.0,
            periods_since_boot: 0,
        }
    }

    /// Records a completed period
    pub fn record(&mut self, reading: &Reading) {
        self.energy_since_boot_kwh += reading.energy_kwh;
        self.periods_since_boot += 1;
        self.latest = Some(reading.clone());
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.latest.is_none()
    }

    /// Average power of the latest period (kW)
    #[must_use]
    pub fn latest_power_kw(&self) -> Option<f64> {
        self.latest.as_ref().map(|r| r.power_kw)
    }

    /// Energy of the latest period (kWh)
    #[must_use]
    pub fn latest_energy_kwh(&self) -> Option<f64> {
        self.latest.as_ref().map(|r| r.energy_kwh)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    #[must_use]
    pub fn energy_since_boot_kwh(&self) -> f64 {
        self.energy_since_boot_kwh
    }

    #[must_use]
    pub fn periods_since_boot(&self) -> u64 {
        self.periods_since_boot
    }

    #[must_use]
    pub fn rate_per_kwh(&self) -> f64 {
        self.rate_per_kwh
    }

    /// Cost of the energy accumulated since boot
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.energy_since_boot_kwh * self.rate_per_kwh
    }

    #[must_use]
    pub fn is_daily_view(&self) -> bool {
        self.daily_view
    }

    pub fn set_daily_view(&mut self, daily: bool) {
        self.daily_view = daily;
    }

    /// Switches between daily and current view, returning the new mode
    pub fn toggle_view(&mut self) -> bool {
        self.daily_view = !self.daily_view;
        self.daily_view
    }

    /// Renders the labels and meter for the active view.
    #[must_use]
    pub fn frame(&self) -> DisplayFrame {
        if self.is_loading() {
            let (primary, secondary) = if self.daily_view {
                ("Energy: loading...", "Cost: loading...")
            } else {
                ("Power: loading...", "Rate: loading...")
            };
            return DisplayFrame {
                primary: primary.to_string(),
                secondary: secondary.to_string(),
                meter_percent: 0,
                meter_level: MeterLevel::Low,
            };
        }

        let (primary, secondary, fraction) = if self.daily_view {
            (
                format!("Energy: {:.3} kWh", self.energy_since_boot_kwh),
                format!("Cost: {:.2}", self.cost()),
                self.energy_since_boot_kwh / DAILY_METER_FULL_KWH,
            )
        } else {
            let power = self.latest_power_kw().unwrap_or_default();
            (
                format!("Power: {:.3} kW", power),
                format!("Rate: {:.2}/kWh", self.rate_per_kwh),
                power / CURRENT_METER_FULL_KW,
            )
        };

        let meter_percent = meter_percent(fraction);
        DisplayFrame {
            primary,
            secondary,
            meter_percent,
            meter_level: MeterLevel::from_percent(meter_percent),
        }
    }
}

fn meter_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction * 100.0).clamp(0.0, 100.0) as u8
}
