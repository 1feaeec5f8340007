// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read responses returned by the appliance.
//!
//! The response mirrors the request: each requested field comes back with
//! its value filled in. Energy fields hold a single tagged value; wallbox
//! fields hold one tagged value per wallbox slot.
//!
//! # Examples
//!
//! ```
//! use senec_exporter::request::EnergyField;
//! use senec_exporter::response::ReadResponse;
//!
//! let json = r#"{
//!     "ENERGY": {
//!         "GUI_BAT_DATA_POWER": "fl_43DE0000",
//!         "GUI_HOUSE_POW": "fl_44160000",
//!         "GUI_GRID_POW": "fl_C2C80000",
//!         "GUI_INVERTER_POWER": "fl_44BB8000",
//!         "GUI_BAT_DATA_FUEL_CHARGE": "fl_425C0000"
//!     }
//! }"#;
//! let response = ReadResponse::from_json(json).unwrap();
//!
//! assert_eq!(response.energy().value(EnergyField::BatteryPower), "fl_43DE0000");
//! assert!(response.wallbox().unwrap().is_none());
//! ```

use serde::Deserialize;

use crate::error::{FormatError, TransportError};
use crate::request::{EnergyField, WallboxField};

/// A structurally validated read response.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResponse {
    /// Energy telemetry, always present.
    #[serde(rename = "ENERGY")]
    energy: EnergyGroup,

    /// Wallbox telemetry, present only when requested and supported.
    ///
    /// Held raw; its shape is only checked by [`ReadResponse::wallbox`].
    #[serde(rename = "WALLBOX", default)]
    wallbox: Option<serde_json::Value>,
}

impl ReadResponse {
    /// Parses and validates a response body.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Json` if the body is not JSON, or
    /// `TransportError::UnexpectedShape` if it is JSON of the wrong shape.
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        serde_json::from_value(value).map_err(|e| TransportError::UnexpectedShape(e.to_string()))
    }

    /// Returns the energy group.
    #[must_use]
    pub fn energy(&self) -> &EnergyGroup {
        &self.energy
    }

    /// Returns the wallbox group, if the appliance reported one.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::UnexpectedShape` if the group is present but
    /// does not hold a list of values per field.
    pub fn wallbox(&self) -> Result<Option<WallboxGroup>, FormatError> {
        match &self.wallbox {
            None => Ok(None),
            Some(value) => WallboxGroup::deserialize(value)
                .map(Some)
                .map_err(|e| FormatError::UnexpectedShape(e.to_string())),
        }
    }
}

/// Values of the `ENERGY` group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EnergyGroup {
    gui_bat_data_power: String,
    gui_house_pow: String,
    gui_grid_pow: String,
    gui_inverter_power: String,
    gui_bat_data_fuel_charge: String,
}

impl EnergyGroup {
    /// Returns the raw tagged value for `field`.
    #[must_use]
    pub fn value(&self, field: EnergyField) -> &str {
        match field {
            EnergyField::BatteryPower => &self.gui_bat_data_power,
            EnergyField::HouseConsumption => &self.gui_house_pow,
            EnergyField::GridConsumption => &self.gui_grid_pow,
            EnergyField::SolarPower => &self.gui_inverter_power,
            EnergyField::BatteryLevel => &self.gui_bat_data_fuel_charge,
        }
    }
}

/// Values of the `WALLBOX` group.
///
/// The appliance batches one reading per wallbox slot; only the first slot
/// is of interest here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct WallboxGroup {
    apparent_charging_power: Vec<String>,
}

impl WallboxGroup {
    /// Returns all slot values for `field`.
    #[must_use]
    pub fn values(&self, field: WallboxField) -> &[String] {
        match field {
            WallboxField::ApparentChargingPower => &self.apparent_charging_power,
        }
    }

    /// Returns the first slot value for `field`.
    #[must_use]
    pub fn first(&self, field: WallboxField) -> Option<&str> {
        self.values(field).first().map(String::as_str)
    }
}
