//! # Uplink Module
//!
//! Everything between a finished reading and the remote ingestion endpoint.
//!
//! This module handles:
//! - Encoding readings as JSON upload payloads
//! - Single-shot HTTP POST delivery (no internal retries)
//! - Link state tracking with rate-limited reconnection

pub mod client;
pub mod link;
pub mod monitor;
pub mod payload;
pub mod transport;

pub use client::{DeliveryOutcome, UploadClient};
pub use link::{Link, LinkState, TcpProbeLink};
pub use monitor::{ConnectivityMonitor, LinkStatus};
pub use payload::UploadPayload;
pub use transport::{PostRequest, Transport, UreqTransport};
