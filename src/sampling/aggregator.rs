//! # Period Aggregator
//!
//! Integrates fixed-interval power samples into energy and emits one
//! [`PeriodSample`] per window of `W` samples.
//!
//! Energy uses rectangular integration:
//!
//! `energy_kwh += power_kw * (interval_secs / 3600)`
//!
//! The aggregator does no I/O; identical input sequences always produce
//! identical output.
//!
//! ## Usage
//!
//! ```
//! use watt_node::sampling::Aggregator;
//!
//! let mut agg = Aggregator::new(2, 1.0);
//! assert!(agg.push(1.0).is_none());
//! let period = agg.push(3.0).unwrap();
//! assert_eq!(period.average_power_kw, 2.0);
//! ```

use tracing::debug;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Summary of one completed window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSample {
    /// Arithmetic mean of the window's power samples (kW)
    pub average_power_kw: f64,
    /// Energy accumulated over the window (kWh)
    pub total_energy_kwh: f64,
}

/// Windowed power/energy accumulator
#[derive(Debug, Clone)]
pub struct Aggregator {
    window_size: usize,
    interval_secs: f64,
    sample_count: usize,
    power_sum: f64,
    energy_kwh: f64,
}

impl Aggregator {
    /// Creates an aggregator for `window_size` samples taken every
    /// `interval_secs` seconds. A zero window is treated as one.
    #[must_use]
    pub fn new(window_size: usize, interval_secs: f64) -> Self {
        Self {
            window_size: window_size.max(1),
            interval_secs,
            sample_count: 0,
            power_sum: 0.0,
            energy_kwh: 0.0,
        }
    }

    /// Adds one power sample (kW). Returns the period summary when the
    /// window completes, after which all accumulators are reset.
    pub fn push(&mut self, power_kw: f64) -> Option<PeriodSample> {
        let contribution = power_kw * (self.interval_secs / SECONDS_PER_HOUR);

        self.power_sum += power_kw;
        self.energy_kwh += contribution;
        self.sample_count += 1;

        debug!(
            "Sample #{} power: {:.3} kW, energy: {:.6} kWh",
            self.sample_count, power_kw, contribution
        );

        if self.sample_count < self.window_size {
            return None;
        }

        let period = PeriodSample {
            average_power_kw: self.power_sum / self.window_size as f64,
            total_energy_kwh: self.energy_kwh,
        };
        self.reset();
        Some(period)
    }

    /// Discards any partially accumulated window.
    pub fn reset(&mut self) {
        self.sample_count = 0;
        self.power_sum = 0.0;
        self.energy_kwh = 0.0;
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Energy accumulated in the current, incomplete window (kWh)
    #[must_use]
    pub fn pending_energy_kwh(&self) -> f64 {
        self.energy_kwh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_constant_one_kilowatt_window() {
        let mut agg = Aggregator::new(30, 1.0);
        let mut emitted = None;
        for _ in 0..30 {
            emitted = agg.push(1.0);
        }
        let period = emitted.expect("window should complete on 30th sample");
        assert_abs_diff_eq!(period.average_power_kw, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(period.total_energy_kwh, 0.008333, epsilon = 1e-6);
    }

    #[test]
    fn test_no_emission_before_window_completes() {
        let mut agg = Aggregator::new(30, 1.0);
        for _ in 0..29 {
            assert!(agg.push(2.0).is_none());
        }
        assert_eq!(agg.sample_count(), 29);
    }

    #[test]
    fn test_resets_after_emission() {
        let mut agg = Aggregator::new(3, 1.0);
        agg.push(1.0);
        agg.push(1.0);
        agg.push(1.0).unwrap();
        assert_eq!(agg.sample_count(), 0);
        assert_eq!(agg.pending_energy_kwh(), 0.0);

        agg.push(4.0);
        agg.push(4.0);
        let second = agg.push(4.0).unwrap();
        assert_abs_diff_eq!(second.average_power_kw, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(second.total_energy_kwh, 12.0 / 3600.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interval_scales_energy() {
        let mut agg = Aggregator::new(1, 10.0);
        let period = agg.push(3.6).unwrap();
        assert_abs_diff_eq!(period.total_energy_kwh, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        let mut agg = Aggregator::new(0, 1.0);
        assert_eq!(agg.window_size(), 1);
        assert!(agg.push(1.0).is_some());
    }

    proptest! {
        #[test]
        fn prop_mean_and_energy_match_samples(
            samples in prop::collection::vec(0.0f64..25.0, 30),
            interval in 0.1f64..10.0,
        ) {
            let mut agg = Aggregator::new(30, interval);
            let mut period = None;
            for &p in &samples {
                period = agg.push(p);
            }
            let period = period.unwrap();
            let mean = samples.iter().sum::<f64>() / 30.0;
            let energy: f64 = samples.iter().map(|p| p * (interval / 3600.0)).sum();
            prop_assert!((period.average_power_kw - mean).abs() < 1e-9);
            prop_assert!((period.total_energy_kwh - energy).abs() < 1e-9);
        }

        #[test]
        fn prop_deterministic(samples in prop::collection::vec(0.0f64..25.0, 0..200)) {
            let run = |input: &[f64]| {
                let mut agg = Aggregator::new(7, 1.0);
                input.iter().filter_map(|&p| agg.push(p)).collect::<Vec<_>>()
            };
            prop_assert_eq!(run(&samples), run(&samples));
        }
    }
}
