// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling the appliance and publishing what it reports.
//!
//! [`Scraper`] runs a single poll cycle: request, validate, decode, publish.
//! [`Scheduler`] repeats cycles at a fixed interval until shutdown, never
//! running two at once.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use senec_exporter::metrics::GaugeRegistry;
//! use senec_exporter::protocol::HttpConfig;
//! use senec_exporter::scraper::{Scheduler, Scraper};
//! use senec_exporter::shutdown::Shutdown;
//!
//! # async fn example() -> senec_exporter::Result<()> {
//! let registry = Arc::new(GaugeRegistry::new());
//! let client = HttpConfig::new("192.168.178.50").into_client()?;
//! let scraper = Scraper::new(client, Arc::clone(&registry)).with_wallbox(true);
//!
//! let shutdown = Shutdown::new();
//! let scheduler = Scheduler::new(scraper, Duration::from_secs(60));
//! let summary = scheduler.run(shutdown.listener()).await;
//! println!("ran {} cycles", summary.cycles);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::decode::{self, Encoding};
use crate::error::{FormatError, TransportError};
use crate::metrics::{Gauge, MetricsSink};
use crate::protocol::Appliance;
use crate::request::{EnergyField, ReadRequest, WallboxField};
use crate::response::ReadResponse;
use crate::shutdown::ShutdownListener;

/// Default time an in-flight cycle may keep running after shutdown.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A decoded value ready for the metrics sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// Target gauge.
    pub gauge: Gauge,
    /// Decoded value.
    pub value: f64,
}

/// A field that could not be decoded in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Appliance field name.
    pub field: &'static str,
    /// Why decoding failed.
    pub error: FormatError,
}

/// Outcome of a poll cycle that reached the appliance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Samples published, in publication order.
    pub samples: Vec<MetricSample>,
    /// Fields skipped because they could not be decoded.
    pub failures: Vec<FieldFailure>,
}

impl CycleReport {
    /// Returns the published value for `gauge`, if any.
    #[must_use]
    pub fn value(&self, gauge: Gauge) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.gauge == gauge)
            .map(|s| s.value)
    }
}

const fn energy_gauge(field: EnergyField) -> Gauge {
    match field {
        EnergyField::BatteryPower => Gauge::BatteryChargingPower,
        EnergyField::HouseConsumption => Gauge::HouseConsumption,
        EnergyField::GridConsumption => Gauge::GridConsumption,
        EnergyField::SolarPower => Gauge::SolarPower,
        EnergyField::BatteryLevel => Gauge::BatteryLevel,
    }
}

// ============================================================================
// Scraper - One poll cycle
// ============================================================================

/// Runs poll cycles against an appliance and writes into a sink.
#[derive(Debug)]
pub struct Scraper<A, S> {
    appliance: A,
    sink: S,
    wallbox: bool,
}

impl<A: Appliance, S: MetricsSink> Scraper<A, S> {
    /// Creates a scraper reading the energy group only.
    #[must_use]
    pub fn new(appliance: A, sink: S) -> Self {
        Self {
            appliance,
            sink,
            wallbox: false,
        }
    }

    /// Enables or disables wallbox monitoring.
    #[must_use]
    pub fn with_wallbox(mut self, enabled: bool) -> Self {
        self.wallbox = enabled;
        self
    }

    /// Returns whether wallbox monitoring is enabled.
    #[must_use]
    pub fn wallbox_enabled(&self) -> bool {
        self.wallbox
    }

    /// Returns the sink values are published to.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Builds the request sent each cycle.
    #[must_use]
    pub fn request(&self) -> ReadRequest {
        ReadRequest::new().with_wallbox(self.wallbox)
    }

    /// Runs one poll cycle.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the appliance cannot be read; nothing is
    /// published in that case. Per-field decode failures are reported in the
    /// returned [`CycleReport`] instead.
    pub async fn poll_once(&self) -> Result<CycleReport, TransportError> {
        let request = self.request();
        let response = self.appliance.read(&request).await?;
        Ok(self.publish(&response))
    }

    /// Decodes `response` and publishes every field that decodes cleanly.
    ///
    /// Energy gauges are published before wallbox gauges.
    pub fn publish(&self, response: &ReadResponse) -> CycleReport {
        let mut report = CycleReport::default();

        for field in EnergyField::ALL {
            let raw = response.energy().value(field);
            self.publish_field(&mut report, field.name(), energy_gauge(field), raw, None);
        }

        if self.wallbox {
            self.publish_wallbox(&mut report, response);
        }

        report
    }

    fn publish_wallbox(&self, report: &mut CycleReport, response: &ReadResponse) {
        let field = WallboxField::ApparentChargingPower;
        let wallbox = match response.wallbox() {
            Ok(Some(wallbox)) => wallbox,
            Ok(None) => {
                tracing::debug!("Response carries no wallbox group");
                return;
            }
            Err(error) => {
                tracing::warn!(
                    field = field.name(),
                    error = %error,
                    "Skipping malformed wallbox group"
                );
                report.failures.push(FieldFailure {
                    field: field.name(),
                    error,
                });
                return;
            }
        };

        let Some(raw) = wallbox.first(field) else {
            tracing::debug!(field = field.name(), "Wallbox reported no slots");
            return;
        };

        self.publish_field(report, field.name(), Gauge::WallboxPower, raw, None);
        self.publish_field(
            report,
            field.name(),
            Gauge::WallboxState,
            raw,
            Some(Encoding::Unsigned),
        );
    }

    // `encoding` overrides the value's own tag when set.
    fn publish_field(
        &self,
        report: &mut CycleReport,
        field: &'static str,
        gauge: Gauge,
        raw: &str,
        encoding: Option<Encoding>,
    ) {
        let decoded = match encoding {
            Some(encoding) => decode::decode_as(raw, encoding),
            None => decode::decode(raw),
        };

        match decoded {
            Ok(value) => {
                tracing::debug!(gauge = gauge.name(), raw, value, "Decoded value");
                self.sink.set_gauge(gauge, value);
                report.samples.push(MetricSample { gauge, value });
            }
            Err(error) => {
                tracing::warn!(field, raw, error = %error, "Skipping undecodable field");
                report.failures.push(FieldFailure { field, error });
            }
        }
    }
}

// ============================================================================
// Scheduler - Repeating cycles
// ============================================================================

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// A poll cycle is in flight.
    Polling,
    /// Shutdown was requested; the timer is gone.
    Stopping,
    /// The scheduler has returned.
    Stopped,
}

/// Counters reported when a [`Scheduler`] stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles started.
    pub cycles: u64,
    /// Cycles that ended in a transport failure.
    pub failed: u64,
    /// Whether an in-flight cycle was abandoned at shutdown.
    pub abandoned: bool,
}

/// Repeats poll cycles at a fixed interval.
///
/// The first cycle starts immediately. Cycles run inline, so at most one is
/// ever in flight; ticks that fall due while a cycle is still running are
/// skipped rather than queued.
#[derive(Debug)]
pub struct Scheduler<A, S> {
    scraper: Scraper<A, S>,
    interval: Duration,
    grace_period: Duration,
    state: watch::Sender<SchedulerState>,
}

impl<A: Appliance, S: MetricsSink> Scheduler<A, S> {
    /// Creates a scheduler polling every `interval`.
    ///
    /// A zero interval is raised to one millisecond.
    #[must_use]
    pub fn new(scraper: Scraper<A, S>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            scraper,
            interval: interval.max(Duration::from_millis(1)),
            grace_period: DEFAULT_GRACE_PERIOD,
            state,
        }
    }

    /// Sets how long an in-flight cycle may continue after shutdown.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Returns the underlying scraper.
    #[must_use]
    pub fn scraper(&self) -> &Scraper<A, S> {
        &self.scraper
    }

    /// Polls until `shutdown` resolves.
    ///
    /// On shutdown the timer is dropped at once. A cycle that is still in
    /// flight gets the grace period to finish and is abandoned after that.
    pub async fn run(&self, mut shutdown: ShutdownListener) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(interval = ?self.interval, "Scheduler started");

        loop {
            self.set_state(SchedulerState::Idle);
            tokio::select! {
                biased;
                () = shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            self.set_state(SchedulerState::Polling);
            summary.cycles += 1;

            let cycle = self.cycle();
            tokio::pin!(cycle);

            let succeeded = tokio::select! {
                biased;
                ok = &mut cycle => ok,
                () = shutdown.wait() => {
                    self.set_state(SchedulerState::Stopping);
                    tracing::debug!(
                        grace_period = ?self.grace_period,
                        "Waiting for in-flight poll cycle"
                    );
                    if let Ok(ok) = tokio::time::timeout(self.grace_period, &mut cycle).await {
                        if !ok {
                            summary.failed += 1;
                        }
                    } else {
                        tracing::warn!("Abandoning in-flight poll cycle");
                        summary.abandoned = true;
                    }
                    break;
                }
            };

            if !succeeded {
                summary.failed += 1;
            }
        }

        self.set_state(SchedulerState::Stopping);
        drop(ticker);
        self.set_state(SchedulerState::Stopped);

        tracing::debug!(
            cycles = summary.cycles,
            failed = summary.failed,
            "Scheduler stopped"
        );
        summary
    }

    async fn cycle(&self) -> bool {
        match self.scraper.poll_once().await {
            Ok(report) => {
                tracing::debug!(
                    published = report.samples.len(),
                    skipped = report.failures.len(),
                    "Poll cycle complete"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Poll cycle failed");
                false
            }
        }
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}
