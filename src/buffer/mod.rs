//! # Offline Buffer Module
//!
//! Holds readings that could not be delivered while the link is down.
//!
//! This module handles:
//! - A fixed-capacity ring that evicts the oldest reading when full
//! - Persisting the ring to durable storage after every change
//! - Restoring the backlog after a restart

pub mod ring;
pub mod snapshot;
pub mod storage;

pub use ring::{DrainReport, EnqueueOutcome, OfflineBuffer};
pub use snapshot::Snapshot;
pub use storage::{FsStorage, MemoryStorage, Storage};
