//! # Delivery Pipeline
//!
//! Decides, for each new reading, whether to upload it live or hold it in
//! the offline buffer, and drains the buffer when the link returns.
//!
//! ## Ordering
//!
//! The backlog always goes out ahead of a live reading. When the link comes
//! back (or is up with a backlog still pending) the buffer is drained oldest
//! first before the new reading is attempted. If the drain stops early, the
//! new reading is queued behind the backlog rather than overtaking it.
//!
//! ## Failure handling
//!
//! No error leaves the pipeline. A failed upload is buffered, a full buffer
//! drops its oldest reading, and storage failures are logged by the buffer.

use tracing::{debug, info, warn};

use crate::buffer::{DrainReport, EnqueueOutcome, OfflineBuffer};
use crate::reading::Reading;
use crate::uplink::{ConnectivityMonitor, DeliveryOutcome, LinkState, UploadClient};

/// What happened to a submitted reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Uploaded live
    Delivered,
    /// Held in the offline buffer
    Buffered,
    /// Held in the offline buffer, which dropped its oldest reading to make room
    BufferedWithEviction,
}

/// Running counters for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub delivered_live: u64,
    pub delivered_from_buffer: u64,
    pub buffered: u64,
    pub evicted: u64,
    pub drain_passes: u64,
}

/// Owns the uplink components and the offline buffer
pub struct DeliveryPipeline {
    monitor: ConnectivityMonitor,
    client: UploadClient,
    buffer: OfflineBuffer,
    stats: PipelineStats,
}

impl std::fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("monitor", &self.monitor)
            .field("buffer", &self.buffer)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DeliveryPipeline {
    pub fn new(monitor: ConnectivityMonitor, client: UploadClient, buffer: OfflineBuffer) -> Self {
        Self {
            monitor,
            client,
            buffer,
            stats: PipelineStats::default(),
        }
    }

    /// Boot sequence: reload any persisted backlog (if requested), make the
    /// first connection attempt, and drain if it succeeds.
    pub fn start(&mut self, restore_backlog: bool) {
        if restore_backlog {
            let restored = self.buffer.restore();
            if restored > 0 {
                info!("{} readings pending from before restart", restored);
            }
        }

        let status = self.monitor.start();
        if status.reconnected {
            self.drain();
        }
    }

    /// Per-tick link supervision. Drains the backlog on a reconnect.
    pub fn service_link(&mut self) -> LinkState {
        let status = self.monitor.poll();
        if status.reconnected {
            info!("Link restored with {} readings buffered", self.buffer.len());
            self.drain();
        }
        self.monitor.state()
    }

    /// Routes a freshly minted reading to the endpoint or the buffer.
    pub fn submit(&mut self, reading: Reading) -> SubmitOutcome {
        if self.service_link() == LinkState::Down {
            info!("Link not connected. Buffering data...");
            return self.enqueue(reading);
        }

        if !self.buffer.is_empty() {
            let report = self.drain();
            if !report.is_complete() {
                debug!("Backlog not cleared, queueing reading behind it");
                return self.enqueue(reading);
            }
        }

        match self.client.deliver(&reading) {
            DeliveryOutcome::Delivered => {
                self.stats.delivered_live += 1;
                SubmitOutcome::Delivered
            }
            DeliveryOutcome::Failed => {
                self.monitor.report_failure();
                self.enqueue(reading)
            }
        }
    }

    fn enqueue(&mut self, reading: Reading) -> SubmitOutcome {
        self.stats.buffered += 1;
        match self.buffer.enqueue(reading) {
            EnqueueOutcome::Stored => SubmitOutcome::Buffered,
            EnqueueOutcome::Evicted(_) => {
                self.stats.evicted += 1;
                SubmitOutcome::BufferedWithEviction
            }
        }
    }

    /// One drain pass over the backlog, oldest first.
    pub fn drain(&mut self) -> DrainReport {
        if self.buffer.is_empty() {
            return DrainReport::default();
        }

        self.stats.drain_passes += 1;
        let client = &self.client;
        let report = self.buffer.drain_oldest_first(|reading| client.deliver(reading));
        self.stats.delivered_from_buffer += report.delivered as u64;

        if !report.is_complete() {
            warn!("Drain stopped with {} readings still buffered", report.remaining);
            self.monitor.report_failure();
        }
        report
    }

    #[must_use]
    pub fn buffer(&self) -> &OfflineBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn link_state(&self) -> LinkState {
        self.monitor.state()
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MemoryStorage;
    use crate::clock::ManualClock;
    use crate::error::NodeError;
    use crate::uplink::link::Link;
    use crate::uplink::transport::{MockTransport, PostRequest, Transport, TransportResponse};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const SNAPSHOT: &str = "/data/energy_data.json";

    #[derive(Clone, Default)]
    struct SwitchLink {
        up: Arc<AtomicBool>,
        reachable: Arc<AtomicBool>,
        attempts: Arc<AtomicUsize>,
    }

    impl Link for SwitchLink {
        fn is_up(&self) -> bool {
            self.up.load(Ordering::SeqCst)
        }

        fn reconnect(&mut self) -> bool {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let ok = self.reachable.load(Ordering::SeqCst);
            self.up.store(ok, Ordering::SeqCst);
            ok
        }

        fn mark_down(&mut self) {
            self.up.store(false, Ordering::SeqCst);
        }
    }

    /// Transport that records every body and answers from a script
    /// (`true` = response, `false` = transport error). Once the script runs
    /// out it keeps answering with `default_ok`.
    #[derive(Clone)]
    struct ScriptedTransport {
        bodies: Arc<Mutex<Vec<String>>>,
        script: Arc<Mutex<Vec<bool>>>,
        default_ok: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        fn new(default_ok: bool) -> Self {
            Self {
                bodies: Arc::new(Mutex::new(Vec::new())),
                script: Arc::new(Mutex::new(Vec::new())),
                default_ok: Arc::new(AtomicBool::new(default_ok)),
            }
        }

        fn script(&self, outcomes: &[bool]) {
            *self.script.lock().unwrap() = outcomes.iter().rev().copied().collect();
        }

        fn sent_times(&self) -> Vec<String> {
            self.bodies
                .lock()
                .unwrap()
                .iter()
                .map(|b| {
                    let v: serde_json::Value = serde_json::from_str(b).unwrap();
                    v["time"].as_str().unwrap().to_string()
                })
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn post(&self, request: &PostRequest) -> crate::error::Result<TransportResponse> {
            self.bodies.lock().unwrap().push(request.body.clone());
            let ok = self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| self.default_ok.load(Ordering::SeqCst));
            if ok {
                Ok(TransportResponse { status: 200, body: "ok".to_string() })
            } else {
                Err(NodeError::Transport("timed out".to_string()))
            }
        }
    }

    struct Harness {
        pipeline: DeliveryPipeline,
        link: SwitchLink,
        transport: ScriptedTransport,
        storage: MemoryStorage,
        clock: Arc<ManualClock>,
    }

    fn harness(capacity: usize, link_up: bool) -> Harness {
        let link = SwitchLink::default();
        link.up.store(link_up, Ordering::SeqCst);
        link.reachable.store(link_up, Ordering::SeqCst);
        let transport = ScriptedTransport::new(true);
        let storage = MemoryStorage::new();
        let clock = Arc::new(ManualClock::new(0));

        let monitor = ConnectivityMonitor::new(
            Box::new(link.clone()),
            Box::new(clock.clone()),
            Duration::from_secs(30),
        );
        let client = UploadClient::new(Box::new(transport.clone()), "http://h/api", "dev");
        let buffer = OfflineBuffer::new(capacity, SNAPSHOT, Box::new(storage.clone()));

        Harness {
            pipeline: DeliveryPipeline::new(monitor, client, buffer),
            link,
            transport,
            storage,
            clock,
        }
    }

    fn reading(n: usize) -> Reading {
        Reading::new(format!("t{}", n), 1.0, 0.008)
    }

    fn names(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
        range.map(|n| format!("t{}", n)).collect()
    }

    fn buffered(h: &Harness) -> Vec<String> {
        h.pipeline.buffer().iter().map(|r| r.timestamp.clone()).collect()
    }

    #[test]
    fn test_live_delivery_when_up() {
        let mut h = harness(50, true);
        assert_eq!(h.pipeline.submit(reading(1)), SubmitOutcome::Delivered);
        assert!(h.pipeline.buffer().is_empty());
        assert_eq!(h.transport.sent_times(), names(1..=1));
        assert_eq!(h.storage.write_count(), 0, "live delivery never touches storage");
    }

    #[test]
    fn test_failed_live_delivery_is_buffered() {
        let mut h = harness(50, true);
        h.transport.script(&[false]);

        assert_eq!(h.pipeline.submit(reading(1)), SubmitOutcome::Buffered);
        assert_eq!(buffered(&h), names(1..=1));
        assert_eq!(h.pipeline.link_state(), LinkState::Down);
    }

    #[test]
    fn test_down_link_buffers_without_attempt() {
        let mut h = harness(50, false);
        for n in 1..=35 {
            assert_eq!(h.pipeline.submit(reading(n)), SubmitOutcome::Buffered);
            h.clock.advance(30_000);
        }
        assert_eq!(h.pipeline.buffer().len(), 35);
        assert!(h.transport.sent_times().is_empty());
    }

    #[test]
    fn test_overflow_while_down_keeps_newest() {
        let mut h = harness(50, false);
        let mut evictions = 0;
        for n in 1..=60 {
            if h.pipeline.submit(reading(n)) == SubmitOutcome::BufferedWithEviction {
                evictions += 1;
            }
            h.clock.advance(30_000);
        }
        assert_eq!(evictions, 10);
        assert_eq!(buffered(&h), names(11..=60));
        assert_eq!(h.pipeline.stats().evicted, 10);
    }

    #[test]
    fn test_reconnect_drains_backlog_before_live_reading() {
        let mut h = harness(50, false);
        for n in 1..=3 {
            h.pipeline.submit(reading(n));
            h.clock.advance(1_000);
        }

        h.link.reachable.store(true, Ordering::SeqCst);
        h.clock.advance(30_000);
        assert_eq!(h.pipeline.submit(reading(4)), SubmitOutcome::Delivered);

        assert_eq!(h.transport.sent_times(), names(1..=4));
        assert!(h.pipeline.buffer().is_empty());
        assert!(!h.storage.contains(std::path::Path::new(SNAPSHOT)));
        assert_eq!(h.pipeline.stats().delivered_from_buffer, 3);
        assert_eq!(h.pipeline.stats().delivered_live, 1);
    }

    #[test]
    fn test_service_link_drains_without_new_reading() {
        let mut h = harness(50, false);
        for n in 1..=5 {
            h.pipeline.submit(reading(n));
        }

        h.link.reachable.store(true, Ordering::SeqCst);
        h.clock.advance(30_000);
        assert_eq!(h.pipeline.service_link(), LinkState::Up);

        assert_eq!(h.transport.sent_times(), names(1..=5));
        assert!(h.pipeline.buffer().is_empty());
    }

    #[test]
    fn test_partial_drain_keeps_order_and_queues_live_reading() {
        let mut h = harness(50, false);
        for n in 1..=10 {
            h.pipeline.submit(reading(n));
        }

        h.link.reachable.store(true, Ordering::SeqCst);
        h.transport.script(&[true, true, false]);
        h.clock.advance(30_000);

        assert_eq!(h.pipeline.submit(reading(11)), SubmitOutcome::Buffered);
        assert_eq!(h.transport.sent_times(), names(1..=3));
        assert_eq!(buffered(&h), names(3..=11));
        assert_eq!(h.pipeline.link_state(), LinkState::Down);
    }

    #[test]
    fn test_backlog_drained_when_up_without_reconnect() {
        let mut h = harness(50, false);
        h.pipeline.submit(reading(1));
        assert_eq!(buffered(&h), names(1..=1));

        // Link came back on its own, no reconnect attempt was due
        h.link.up.store(true, Ordering::SeqCst);
        h.clock.advance(1_000);

        assert_eq!(h.pipeline.submit(reading(2)), SubmitOutcome::Delivered);
        assert_eq!(h.transport.sent_times(), names(1..=2));
        assert!(h.pipeline.buffer().is_empty());
        assert_eq!(h.link.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_delivery_retried_after_reconnect() {
        let mut h = harness(50, true);
        h.transport.script(&[false]);
        h.pipeline.submit(reading(1));

        h.link.reachable.store(true, Ordering::SeqCst);
        h.clock.advance(29_000);
        h.pipeline.service_link();
        assert_eq!(h.pipeline.buffer().len(), 1, "reconnect held back after failure");

        h.clock.advance(1_000);
        h.pipeline.service_link();
        assert!(h.pipeline.buffer().is_empty());
        assert_eq!(h.transport.sent_times(), vec!["t1", "t1"]);
    }

    #[test]
    fn test_start_restores_and_drains() {
        let storage = MemoryStorage::new();
        {
            let mut buffer = OfflineBuffer::new(50, SNAPSHOT, Box::new(storage.clone()));
            buffer.enqueue(reading(1));
            buffer.enqueue(reading(2));
        }

        let link = SwitchLink::default();
        link.reachable.store(true, Ordering::SeqCst);
        let transport = ScriptedTransport::new(true);
        let monitor = ConnectivityMonitor::new(
            Box::new(link.clone()),
            Box::new(ManualClock::new(0)),
            Duration::from_secs(30),
        );
        let client = UploadClient::new(Box::new(transport.clone()), "http://h/api", "dev");
        let buffer = OfflineBuffer::new(50, SNAPSHOT, Box::new(storage.clone()));
        let mut pipeline = DeliveryPipeline::new(monitor, client, buffer);

        pipeline.start(true);

        assert_eq!(transport.sent_times(), names(1..=2));
        assert!(pipeline.buffer().is_empty());
        assert_eq!(link.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_without_restore_ignores_snapshot() {
        let storage = MemoryStorage::new();
        {
            let mut buffer = OfflineBuffer::new(50, SNAPSHOT, Box::new(storage.clone()));
            buffer.enqueue(reading(1));
        }

        let mut transport = MockTransport::new();
        transport.expect_post().never();
        let link = SwitchLink::default();
        let monitor = ConnectivityMonitor::new(
            Box::new(link),
            Box::new(ManualClock::new(0)),
            Duration::from_secs(30),
        );
        let client = UploadClient::new(Box::new(transport), "http://h/api", "dev");
        let buffer = OfflineBuffer::new(50, SNAPSHOT, Box::new(storage));
        let mut pipeline = DeliveryPipeline::new(monitor, client, buffer);

        pipeline.start(false);
        assert!(pipeline.buffer().is_empty());
    }
}
