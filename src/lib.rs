//! # Watt Node Library
//!
//! Mains energy telemetry with an offline-resilient upload path.
//!
//! This library samples RMS current, integrates it into per-period energy
//! readings, and delivers them to a remote ingestion endpoint. Readings that
//! cannot be delivered are held in a bounded, persisted buffer and replayed
//! oldest first once the link returns.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod node;
pub mod pipeline;
pub mod reading;
pub mod sampling;
pub mod uplink;

pub use config::Config;
pub use error::{NodeError, Result};
pub use node::{TelemetryNode, TickOutcome};
pub use reading::Reading;
