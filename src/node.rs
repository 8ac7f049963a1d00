//! # Telemetry Node
//!
//! The single pipeline context. Each [`TelemetryNode::tick`] runs one
//! sampling interval end to end: link supervision, one sensor read, the
//! stabilization gate, aggregation and, when a window completes, delivery.
//!
//! Nothing in a tick returns an error. Sensor faults skip the tick, and
//! delivery and storage faults are absorbed by the pipeline.

use tracing::{debug, info, warn};

use crate::buffer::{FsStorage, OfflineBuffer};
use crate::clock::{LocalTimeSource, SystemClock, TimeSource};
use crate::config::Config;
use crate::display::DisplayFeed;
use crate::error::Result;
use crate::pipeline::{DeliveryPipeline, SubmitOutcome};
use crate::reading::Reading;
use crate::sampling::{self, power_kw, Aggregator, CurrentSensor, FilterVerdict, StabilizationFilter};
use crate::uplink::{ConnectivityMonitor, TcpProbeLink, UploadClient, UreqTransport};

/// What a single tick produced
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sensor could not be read
    SensorFault,
    /// Sample consumed by the warm-up window
    Warming,
    /// Sample added to the current window
    Accumulated,
    /// A window completed and the reading was routed
    Completed {
        reading: Reading,
        outcome: SubmitOutcome,
    },
}

/// Sensor-to-uplink pipeline owned by the control loop
pub struct TelemetryNode {
    sensor: Box<dyn CurrentSensor>,
    mains_voltage: f64,
    filter: StabilizationFilter,
    aggregator: Aggregator,
    time_source: Box<dyn TimeSource>,
    pipeline: DeliveryPipeline,
    display: DisplayFeed,
}

impl std::fmt::Debug for TelemetryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryNode")
            .field("filter", &self.filter)
            .field("aggregator", &self.aggregator)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl TelemetryNode {
    /// Assembles a node from already-built parts. Sampling and display
    /// parameters come from `config`.
    pub fn new(
        config: &Config,
        sensor: Box<dyn CurrentSensor>,
        time_source: Box<dyn TimeSource>,
        pipeline: DeliveryPipeline,
    ) -> Self {
        Self {
            sensor,
            mains_voltage: config.sensor.mains_voltage,
            filter: StabilizationFilter::new(config.sampling.stabilization_samples),
            aggregator: Aggregator::new(config.sampling.window_size, config.sampling.interval_secs()),
            time_source,
            pipeline,
            display: DisplayFeed::new(config.display.rate_per_kwh),
        }
    }

    /// Builds the production node: configured sensor, local wall clock,
    /// TCP link probe, HTTP transport and filesystem-backed buffer.
    ///
    /// # Errors
    ///
    /// Returns error if the uplink endpoint cannot be parsed
    pub fn from_config(config: &Config) -> Result<Self> {
        let link = TcpProbeLink::new(&config.uplink.endpoint, config.uplink.timeout())?;
        let monitor = ConnectivityMonitor::new(
            Box::new(link),
            Box::new(SystemClock::new()),
            config.uplink.reconnect_interval(),
        );
        let client = UploadClient::new(
            Box::new(UreqTransport::new(config.uplink.timeout())),
            config.uplink.upload_url(),
            config.device.device_id.as_str(),
        );
        let buffer = OfflineBuffer::new(
            config.buffer.capacity,
            config.buffer.snapshot_path.clone(),
            Box::new(FsStorage::new()),
        );

        Ok(Self::new(
            config,
            sampling::sensor::from_config(&config.sensor),
            Box::new(LocalTimeSource),
            DeliveryPipeline::new(monitor, client, buffer),
        ))
    }

    /// Boot sequence: restore the backlog (if enabled) and make the first
    /// connection attempt.
    pub fn start(&mut self, restore_backlog: bool) {
        info!(
            "Node starting: {} samples per period, sensor stable: {}",
            self.aggregator.window_size(),
            self.filter.is_stable()
        );
        self.pipeline.start(restore_backlog);
    }

    /// Runs one sampling interval.
    pub fn tick(&mut self) -> TickOutcome {
        self.pipeline.service_link();

        let irms = match self.sensor.read_irms() {
            Ok(irms) => irms,
            Err(e) => {
                warn!("Sensor read failed, skipping sample: {}", e);
                return TickOutcome::SensorFault;
            }
        };

        if self.filter.admit() == FilterVerdict::Discarded {
            return TickOutcome::Warming;
        }

        let power = power_kw(irms, self.mains_voltage);
        debug!("Irms: {:.3} A, Power: {:.3} kW", irms, power);

        let Some(period) = self.aggregator.push(power) else {
            return TickOutcome::Accumulated;
        };

        let reading = Reading::from_period(self.time_source.timestamp_or_sentinel(), &period);
        info!(
            "Period complete: {:.3} kW avg, {:.5} kWh",
            reading.power_kw, reading.energy_kwh
        );
        self.display.record(&reading);

        let outcome = self.pipeline.submit(reading.clone());
        TickOutcome::Completed { reading, outcome }
    }

    #[must_use]
    pub fn display(&self) -> &DisplayFeed {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayFeed {
        &mut self.display
    }

    #[must_use]
    pub fn pipeline(&self) -> &DeliveryPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.filter.is_stable()
    }
}
