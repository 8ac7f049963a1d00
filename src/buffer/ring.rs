//! # Offline Ring Buffer
//!
//! Fixed-capacity FIFO of readings that could not be delivered. Slots are
//! allocated once; `write_index` points one past the newest entry and `count`
//! entries before it (mod capacity) are pending, so the i-th oldest entry
//! lives at `(write_index - count + i) mod C`.
//!
//! ```text
//! capacity 5, count 3, write_index 4
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │     │ r1  │ r2  │ r3  │     │
//! └─────┴─────┴─────┴─────┴─────┘
//!          ↑ oldest         ↑ write_index
//! ```
//!
//! When full, a new write lands on the oldest slot: exactly one reading is
//! lost and the newest is kept.
//!
//! Every mutation rewrites the durable snapshot. Storage failures are logged
//! and the buffer keeps operating in memory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::snapshot::Snapshot;
use super::storage::Storage;
use crate::reading::Reading;
use crate::uplink::DeliveryOutcome;

#[derive(Debug, Clone, Default)]
struct Slot {
    reading: Option<Reading>,
    valid: bool,
}

/// Result of [`OfflineBuffer::enqueue`]
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// Stored without loss
    Stored,
    /// Buffer was full; the returned oldest reading was overwritten
    Evicted(Reading),
}

/// Result of one drain pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Readings delivered and removed during the pass
    pub delivered: usize,
    /// Readings still buffered afterwards
    pub remaining: usize,
}

impl DrainReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Bounded, persisted FIFO of undelivered readings
pub struct OfflineBuffer {
    slots: Box<[Slot]>,
    write_index: usize,
    count: usize,
    snapshot_path: PathBuf,
    storage: Box<dyn Storage>,
}

impl std::fmt::Debug for OfflineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineBuffer")
            .field("capacity", &self.slots.len())
            .field("count", &self.count)
            .field("write_index", &self.write_index)
            .field("snapshot_path", &self.snapshot_path)
            .finish_non_exhaustive()
    }
}

impl OfflineBuffer {
    /// Creates an empty buffer. A zero capacity is treated as one.
    pub fn new(capacity: usize, snapshot_path: impl Into<PathBuf>, storage: Box<dyn Storage>) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![Slot::default(); capacity].into_boxed_slice(),
            write_index: 0,
            count: 0,
            snapshot_path: snapshot_path.into(),
            storage,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Slot index of the i-th oldest pending entry
    fn index_of(&self, i: usize) -> usize {
        let capacity = self.capacity();
        (self.write_index + capacity - self.count + i) % capacity
    }

    /// Pending readings, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        (0..self.count).filter_map(move |i| {
            let slot = &self.slots[self.index_of(i)];
            if slot.valid {
                slot.reading.as_ref()
            } else {
                None
            }
        })
    }

    /// Appends a reading, evicting the oldest one if the buffer is full,
    /// then persists the snapshot.
    pub fn enqueue(&mut self, reading: Reading) -> EnqueueOutcome {
        let outcome = self.insert(reading);
        match &outcome {
            EnqueueOutcome::Stored => {
                info!("Reading buffered. Total buffered readings: {}", self.count);
            }
            EnqueueOutcome::Evicted(lost) => {
                warn!(
                    "Offline buffer full ({}), dropped oldest reading from {}",
                    self.capacity(),
                    lost.timestamp
                );
            }
        }
        self.persist();
        outcome
    }

    fn insert(&mut self, reading: Reading) -> EnqueueOutcome {
        let capacity = self.capacity();
        let slot = &mut self.slots[self.write_index];

        // When full, write_index already sits on the oldest entry.
        let outcome = if self.count == capacity {
            match slot.reading.take() {
                Some(lost) if slot.valid => EnqueueOutcome::Evicted(lost),
                _ => EnqueueOutcome::Stored,
            }
        } else {
            self.count += 1;
            EnqueueOutcome::Stored
        };

        slot.reading = Some(reading);
        slot.valid = true;
        self.write_index = (self.write_index + 1) % capacity;
        outcome
    }

    /// Delivers pending readings oldest first, stopping at the first failure.
    ///
    /// Delivered readings are removed; the failed reading and everything
    /// after it stay buffered in their original order.
    pub fn drain_oldest_first<F>(&mut self, mut deliver: F) -> DrainReport
    where
        F: FnMut(&Reading) -> DeliveryOutcome,
    {
        if self.count == 0 {
            return DrainReport::default();
        }

        let pending = self.count;
        info!("Uploading {} buffered readings...", pending);

        let mut removed = 0;
        for i in 0..pending {
            let idx = self.index_of(i);
            let slot = &self.slots[idx];
            let Some(reading) = slot.reading.as_ref().filter(|_| slot.valid) else {
                continue;
            };

            match deliver(reading) {
                DeliveryOutcome::Delivered => {
                    let slot = &mut self.slots[idx];
                    slot.valid = false;
                    slot.reading = None;
                    removed += 1;
                }
                DeliveryOutcome::Failed => {
                    debug!("Drain stopped at buffered reading {} of {}", i + 1, pending);
                    break;
                }
            }
        }

        // Removed entries are always the oldest, so shrinking count from
        // the front drops exactly those.
        self.count -= removed;
        info!("Successfully uploaded {} out of {} buffered readings", removed, pending);

        if self.count == 0 {
            self.write_index = 0;
            self.remove_snapshot();
        } else if removed > 0 {
            self.persist();
        }

        DrainReport {
            delivered: removed,
            remaining: self.count,
        }
    }

    /// Reloads a previously persisted snapshot into the buffer.
    ///
    /// Readings are re-inserted oldest first, so if the snapshot holds more
    /// than the capacity only the newest survive. Returns how many readings
    /// were restored. Unreadable snapshots are logged and ignored.
    pub fn restore(&mut self) -> usize {
        let bytes = match self.storage.read(&self.snapshot_path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return 0,
            Err(e) => {
                warn!("Failed to read snapshot {}: {}", self.snapshot_path.display(), e);
                return 0;
            }
        };

        let snapshot = match Snapshot::decode(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring corrupt snapshot {}: {}", self.snapshot_path.display(), e);
                return 0;
            }
        };

        for reading in snapshot.readings {
            self.insert(reading);
        }

        if self.count > 0 {
            info!("Restored {} buffered readings from {}", self.count, self.snapshot_path.display());
            self.persist();
        }
        self.count
    }

    fn persist(&mut self) {
        let snapshot = Snapshot {
            readings: self.iter().cloned().collect(),
        };

        let bytes = match snapshot.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode buffer snapshot: {}", e);
                return;
            }
        };

        match self.storage.write(&self.snapshot_path, &bytes) {
            Ok(()) => debug!("Buffered readings saved to {}", self.snapshot_path.display()),
            Err(e) => warn!("Failed to write snapshot {}: {}", self.snapshot_path.display(), e),
        }
    }

    fn remove_snapshot(&mut self) {
        match self.storage.remove(&self.snapshot_path) {
            Ok(()) => info!("All buffered readings uploaded and snapshot deleted"),
            Err(e) => warn!("Failed to delete snapshot {}: {}", self.snapshot_path.display(), e),
        }
    }
}
