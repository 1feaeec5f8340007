// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read requests sent to the appliance.
//!
//! A read request names the fields to report, grouped by subsystem. Every
//! field maps to an empty string, which the appliance answers with the
//! field's current value.
//!
//! # Examples
//!
//! ```
//! use senec_exporter::request::ReadRequest;
//!
//! let request = ReadRequest::new().with_wallbox(true);
//! let body = serde_json::to_value(&request).unwrap();
//!
//! assert_eq!(body["ENERGY"]["GUI_HOUSE_POW"], "");
//! assert_eq!(body["WALLBOX"]["APPARENT_CHARGING_POWER"], "");
//! ```

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Name of the always-requested telemetry group.
pub const ENERGY_GROUP: &str = "ENERGY";

/// Name of the optional charging-station group.
pub const WALLBOX_GROUP: &str = "WALLBOX";

/// Fields read from the `ENERGY` group, in publication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnergyField {
    /// Battery charge (positive) or discharge (negative) power in watts.
    BatteryPower,
    /// House consumption in watts.
    HouseConsumption,
    /// Grid import (positive) or export (negative) in watts.
    GridConsumption,
    /// Inverter output in watts.
    SolarPower,
    /// Battery state of charge in percent.
    BatteryLevel,
}

impl EnergyField {
    /// All energy fields, in publication order.
    pub const ALL: [Self; 5] = [
        Self::BatteryPower,
        Self::HouseConsumption,
        Self::GridConsumption,
        Self::SolarPower,
        Self::BatteryLevel,
    ];

    /// Returns the appliance's name for this field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BatteryPower => "GUI_BAT_DATA_POWER",
            Self::HouseConsumption => "GUI_HOUSE_POW",
            Self::GridConsumption => "GUI_GRID_POW",
            Self::SolarPower => "GUI_INVERTER_POWER",
            Self::BatteryLevel => "GUI_BAT_DATA_FUEL_CHARGE",
        }
    }
}

/// Fields read from the `WALLBOX` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WallboxField {
    /// Apparent charging power, reported once per connected wallbox.
    ApparentChargingPower,
}

impl WallboxField {
    /// All wallbox fields.
    pub const ALL: [Self; 1] = [Self::ApparentChargingPower];

    /// Returns the appliance's name for this field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ApparentChargingPower => "APPARENT_CHARGING_POWER",
        }
    }
}

/// A read request covering the energy group and, optionally, the wallbox
/// group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRequest {
    wallbox: bool,
}

impl ReadRequest {
    /// Creates a request for the energy group only.
    #[must_use]
    pub const fn new() -> Self {
        Self { wallbox: false }
    }

    /// Includes or omits the wallbox group.
    #[must_use]
    pub const fn with_wallbox(mut self, enabled: bool) -> Self {
        self.wallbox = enabled;
        self
    }

    /// Returns whether the wallbox group is requested.
    #[must_use]
    pub const fn includes_wallbox(&self) -> bool {
        self.wallbox
    }

    /// Returns the request body as nested group and field maps.
    #[must_use]
    pub fn body(&self) -> BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> {
        let mut body = BTreeMap::new();

        body.insert(
            ENERGY_GROUP,
            EnergyField::ALL.iter().map(|f| (f.name(), "")).collect(),
        );

        if self.wallbox {
            body.insert(
                WALLBOX_GROUP,
                WallboxField::ALL.iter().map(|f| (f.name(), "")).collect(),
            );
        }

        body
    }
}

impl Serialize for ReadRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body().serialize(serializer)
    }
}
