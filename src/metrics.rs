// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gauges published by the exporter.
//!
//! The scraper writes into a [`MetricsSink`]; the serving endpoint renders
//! a [`GaugeRegistry`] in the Prometheus text exposition format.
//!
//! # Examples
//!
//! ```
//! use senec_exporter::metrics::{Gauge, GaugeRegistry, MetricsSink};
//!
//! let registry = GaugeRegistry::new();
//! registry.set_gauge(Gauge::BatteryLevel, 87.0);
//!
//! assert_eq!(registry.get(Gauge::BatteryLevel), Some(87.0));
//! assert!(registry.render().contains("senec_battery_level 87\n"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// The gauges this exporter defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gauge {
    /// Battery charge (positive) or discharge (negative) power in watts.
    BatteryChargingPower,
    /// Battery state of charge in percent.
    BatteryLevel,
    /// House consumption in watts.
    HouseConsumption,
    /// Grid import (positive) or export (negative) in watts.
    GridConsumption,
    /// Inverter output in watts.
    SolarPower,
    /// Wallbox apparent charging power in watts.
    WallboxPower,
    /// Raw wallbox state code.
    WallboxState,
}

impl Gauge {
    /// All gauges, in exposition order.
    pub const ALL: [Self; 7] = [
        Self::BatteryChargingPower,
        Self::BatteryLevel,
        Self::HouseConsumption,
        Self::GridConsumption,
        Self::SolarPower,
        Self::WallboxPower,
        Self::WallboxState,
    ];

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BatteryChargingPower => "senec_battery_charging_power",
            Self::BatteryLevel => "senec_battery_level",
            Self::HouseConsumption => "senec_house_consumption",
            Self::GridConsumption => "senec_grid_consumption",
            Self::SolarPower => "senec_solar_power",
            Self::WallboxPower => "senec_wallbox_power",
            Self::WallboxState => "senec_wallbox_state",
        }
    }

    /// Returns the metric help text.
    #[must_use]
    pub const fn help(&self) -> &'static str {
        match self {
            Self::BatteryChargingPower => {
                "Battery charging power in watts, negative while discharging"
            }
            Self::BatteryLevel => "Battery state of charge in percent",
            Self::HouseConsumption => "House consumption in watts",
            Self::GridConsumption => "Grid consumption in watts, negative while exporting",
            Self::SolarPower => "Solar inverter output in watts",
            Self::WallboxPower => "Wallbox apparent charging power in watts",
            Self::WallboxState => "Wallbox state code",
        }
    }
}

/// Destination for decoded values.
///
/// A sink keeps the last value written per gauge.
pub trait MetricsSink {
    /// Records the current value of `gauge`.
    fn set_gauge(&self, gauge: Gauge, value: f64);
}

impl<S: MetricsSink + ?Sized> MetricsSink for Arc<S> {
    fn set_gauge(&self, gauge: Gauge, value: f64) {
        (**self).set_gauge(gauge, value);
    }
}

/// In-process gauge store with text exposition.
///
/// Gauges that were never written are left out of the exposition.
#[derive(Debug, Default)]
pub struct GaugeRegistry {
    values: RwLock<BTreeMap<Gauge, f64>>,
}

impl GaugeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last value written to `gauge`.
    #[must_use]
    pub fn get(&self, gauge: Gauge) -> Option<f64> {
        self.values.read().get(&gauge).copied()
    }

    /// Returns every written gauge with its value, in exposition order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Gauge, f64)> {
        self.values.read().iter().map(|(g, v)| (*g, *v)).collect()
    }

    /// Renders the registry in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (gauge, value) in self.snapshot() {
            let name = gauge.name();
            let _ = writeln!(out, "# HELP {name} {}", gauge.help());
            let _ = writeln!(out, "# TYPE {name} gauge");
            let _ = writeln!(out, "{name} {}", format_value(value));
        }
        out
    }
}

impl MetricsSink for GaugeRegistry {
    fn set_gauge(&self, gauge: Gauge, value: f64) {
        self.values.write().insert(gauge, value);
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
