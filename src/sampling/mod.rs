//! # Sampling Module
//!
//! Turns raw current measurements into period summaries.
//!
//! This module handles:
//! - Reading RMS current from a sensor source and converting it to power
//! - Discarding samples while the analog front-end settles after boot
//! - Integrating power into energy and emitting one summary per window

pub mod aggregator;
pub mod sensor;
pub mod stabilization;

pub use aggregator::{Aggregator, PeriodSample};
pub use sensor::{power_kw, CurrentSensor, FileSensor, SimulatedSensor};
pub use stabilization::{FilterVerdict, StabilizationFilter};
