// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scheduler lifecycle tests against a scripted appliance, on paused time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use senec_exporter::error::TransportError;
use senec_exporter::metrics::{Gauge, GaugeRegistry};
use senec_exporter::protocol::Appliance;
use senec_exporter::request::ReadRequest;
use senec_exporter::response::ReadResponse;
use senec_exporter::scraper::{Scheduler, SchedulerState, Scraper};
use senec_exporter::shutdown::Shutdown;
use tokio::time::Instant;

// ============================================================================
// Scripted appliance
// ============================================================================

enum Step {
    Respond(String),
    Delayed(Duration, String),
    Fail,
}

#[derive(Default)]
struct ScriptedAppliance {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedAppliance {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl Appliance for ScriptedAppliance {
    async fn read(&self, _request: &ReadRequest) -> Result<ReadResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().push(Instant::now());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = self.script.lock().pop_front();
        let result = match step {
            Some(Step::Respond(body)) => ReadResponse::from_json(&body),
            Some(Step::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                ReadResponse::from_json(&body)
            }
            Some(Step::Fail) | None => Err(TransportError::Status {
                code: 503,
                reason: "Service Unavailable".to_string(),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn fl(value: f32) -> String {
    format!("fl_{:08X}", value.to_bits())
}

/// A response whose energy values are all derived from `base`.
fn energy(base: f32) -> String {
    serde_json::json!({
        "ENERGY": {
            "GUI_BAT_DATA_POWER": fl(base),
            "GUI_HOUSE_POW": fl(base + 1.0),
            "GUI_GRID_POW": fl(base + 2.0),
            "GUI_INVERTER_POWER": fl(base + 3.0),
            "GUI_BAT_DATA_FUEL_CHARGE": fl(base + 4.0)
        }
    })
    .to_string()
}

fn scheduler<'a>(
    appliance: &'a ScriptedAppliance,
    registry: &Arc<GaugeRegistry>,
) -> Scheduler<&'a ScriptedAppliance, Arc<GaugeRegistry>> {
    Scheduler::new(
        Scraper::new(appliance, Arc::clone(registry)),
        Duration::from_secs(60),
    )
}

// ============================================================================
// Ticking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_every_interval() {
    let appliance = ScriptedAppliance::new([
        Step::Respond(energy(10.0)),
        Step::Respond(energy(20.0)),
        Step::Respond(energy(30.0)),
    ]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let shutdown = Shutdown::new();
    let start = Instant::now();

    let driver = async {
        appliance.wait_for_calls(3).await;
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed, 0);

    let started = appliance.started.lock();
    assert_eq!(started[0] - start, Duration::ZERO);
    assert_eq!(started[1] - started[0], Duration::from_secs(60));
    assert_eq!(started[2] - started[1], Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn failed_tick_does_not_leak_into_next() {
    let appliance = ScriptedAppliance::new([
        Step::Respond(energy(100.0)),
        Step::Fail,
        Step::Respond(energy(300.0)),
    ]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let shutdown = Shutdown::new();

    let driver = async {
        appliance.wait_for_calls(1).await;
        assert_eq!(registry.get(Gauge::BatteryChargingPower), Some(100.0));

        appliance.wait_for_calls(2).await;
        // a failed cycle leaves the last published values alone
        assert_eq!(registry.get(Gauge::BatteryChargingPower), Some(100.0));

        appliance.wait_for_calls(3).await;
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed, 1);

    assert_eq!(registry.get(Gauge::BatteryChargingPower), Some(300.0));
    assert_eq!(registry.get(Gauge::HouseConsumption), Some(301.0));
    assert_eq!(registry.get(Gauge::GridConsumption), Some(302.0));
    assert_eq!(registry.get(Gauge::SolarPower), Some(303.0));
    assert_eq!(registry.get(Gauge::BatteryLevel), Some(304.0));
    assert_eq!(registry.snapshot().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn slow_cycle_never_overlaps_the_next() {
    let appliance = ScriptedAppliance::new([
        Step::Delayed(Duration::from_secs(150), energy(1.0)),
        Step::Respond(energy(2.0)),
        Step::Respond(energy(3.0)),
    ]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let shutdown = Shutdown::new();

    let driver = async {
        appliance.wait_for_calls(3).await;
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert_eq!(summary.cycles, 3);
    assert_eq!(appliance.max_in_flight.load(Ordering::SeqCst), 1);

    let started = appliance.started.lock();
    assert!(started[1] - started[0] >= Duration::from_secs(150));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn shutdown_while_idle_stops_ticking() {
    let appliance = ScriptedAppliance::new([Step::Respond(energy(1.0))]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let states = scheduler.subscribe();
    let shutdown = Shutdown::new();

    let driver = async {
        appliance.wait_for_calls(1).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert_eq!(summary.cycles, 1);
    assert!(!summary.abandoned);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(*states.borrow(), SchedulerState::Stopped);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(appliance.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_start_runs_no_cycle() {
    let appliance = ScriptedAppliance::new([]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let summary = scheduler.run(shutdown.listener()).await;

    assert_eq!(summary.cycles, 0);
    assert_eq!(appliance.calls(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn in_flight_cycle_finishes_within_grace_period() {
    let appliance =
        ScriptedAppliance::new([Step::Delayed(Duration::from_secs(2), energy(42.0))]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry).with_grace_period(Duration::from_secs(5));
    let shutdown = Shutdown::new();

    let driver = async {
        appliance.wait_for_calls(1).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.state(), SchedulerState::Polling);
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert!(!summary.abandoned);
    assert_eq!(registry.get(Gauge::BatteryChargingPower), Some(42.0));
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn hung_cycle_is_abandoned_after_grace_period() {
    let appliance =
        ScriptedAppliance::new([Step::Delayed(Duration::from_secs(3600), energy(42.0))]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry).with_grace_period(Duration::from_secs(5));
    let shutdown = Shutdown::new();
    let start = Instant::now();

    let driver = async {
        appliance.wait_for_calls(1).await;
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);

    assert!(summary.abandoned);
    assert!(Instant::now() - start < Duration::from_secs(60));
    assert!(registry.snapshot().is_empty());
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn healthy_lifecycle_is_silent_at_info_level() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let appliance = ScriptedAppliance::new([Step::Respond(energy(1.0))]);
    let registry = Arc::new(GaugeRegistry::new());
    let scheduler = scheduler(&appliance, &registry);
    let shutdown = Shutdown::new();

    let driver = async {
        appliance.wait_for_calls(1).await;
        shutdown.trigger();
    };
    let (summary, ()) = tokio::join!(scheduler.run(shutdown.listener()), driver);
    assert_eq!(summary.cycles, 1);

    let output = String::from_utf8(logs.0.lock().clone()).unwrap();
    assert!(output.is_empty(), "unexpected output: {output}");
}
