//! # Startup Stabilization
//!
//! Drops the first K samples after boot so a settling current transformer
//! does not produce spurious readings.
//!
//! ## Usage
//!
//! ```
//! use watt_node::sampling::{FilterVerdict, StabilizationFilter};
//!
//! let mut filter = StabilizationFilter::new(2);
//! assert_eq!(filter.admit(), FilterVerdict::Discarded);
//! assert_eq!(filter.admit(), FilterVerdict::Discarded);
//! assert_eq!(filter.admit(), FilterVerdict::Passed);
//! ```

use tracing::{debug, info};

/// Filter state. Once `Stable`, never returns to `Warming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Warming { count_so_far: u32 },
    Stable,
}

/// Outcome for a single raw sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Sample was consumed by the warm-up window
    Discarded,
    /// Sample should be forwarded to the aggregator
    Passed,
}

/// Warm-up gate in front of the aggregator.
#[derive(Debug, Clone)]
pub struct StabilizationFilter {
    window: u32,
    state: FilterState,
}

impl StabilizationFilter {
    /// Creates a filter that discards `window` samples. A zero window is
    /// stable from the start.
    #[must_use]
    pub fn new(window: u32) -> Self {
        let state = if window == 0 {
            FilterState::Stable
        } else {
            FilterState::Warming { count_so_far: 0 }
        };
        Self { window, state }
    }

    /// Feeds one raw sample through the filter.
    pub fn admit(&mut self) -> FilterVerdict {
        match self.state {
            FilterState::Stable => FilterVerdict::Passed,
            FilterState::Warming { count_so_far } => {
                let count_so_far = count_so_far + 1;
                if count_so_far >= self.window {
                    self.state = FilterState::Stable;
                    info!("Sensor stabilized after {} samples", self.window);
                } else {
                    self.state = FilterState::Warming { count_so_far };
                    debug!("Stabilizing... {}/{}", count_so_far, self.window);
                }
                FilterVerdict::Discarded
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.state == FilterState::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_window_is_stable() {
        let mut filter = StabilizationFilter::new(0);
        assert!(filter.is_stable());
        assert_eq!(filter.admit(), FilterVerdict::Passed);
    }

    #[test]
    fn test_warming_counts_up() {
        let mut filter = StabilizationFilter::new(3);
        assert_eq!(filter.state(), FilterState::Warming { count_so_far: 0 });
        filter.admit();
        assert_eq!(filter.state(), FilterState::Warming { count_so_far: 1 });
        filter.admit();
        assert_eq!(filter.state(), FilterState::Warming { count_so_far: 2 });
        filter.admit();
        assert_eq!(filter.state(), FilterState::Stable);
    }

    #[test]
    fn test_eleventh_sample_is_first_to_pass() {
        let mut filter = StabilizationFilter::new(10);
        let passed = (0..11)
            .map(|_| filter.admit())
            .filter(|v| *v == FilterVerdict::Passed)
            .count();
        assert_eq!(passed, 1);
    }

    #[test]
    fn test_stable_is_terminal() {
        let mut filter = StabilizationFilter::new(1);
        assert_eq!(filter.admit(), FilterVerdict::Discarded);
        for _ in 0..100 {
            assert_eq!(filter.admit(), FilterVerdict::Passed);
        }
        assert!(filter.is_stable());
    }
}
