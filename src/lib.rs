// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `senec_exporter` - Prometheus exporter for SENEC home energy storage.
//!
//! The appliance exposes its live readings through a JSON endpoint,
//! `/lala.cgi`, where every number is a tagged hex string such as
//! `fl_43DE0000`. This crate polls that endpoint, decodes the values and
//! publishes them as gauges on a `/metrics` endpoint.
//!
//! # Published Gauges
//!
//! - Battery charging power, battery level
//! - House consumption, grid consumption, solar power
//! - Wallbox charging power and state (with `--wallbox`)
//!
//! # Quick Start
//!
//! ## Decoding a value
//!
//! ```
//! use senec_exporter::decode::decode;
//!
//! assert_eq!(decode("fl_43DE0000").unwrap(), 444.0);
//! ```
//!
//! ## Running the exporter
//!
//! ```no_run
//! use clap::Parser;
//! use senec_exporter::config::ExporterConfig;
//! use senec_exporter::shutdown::Shutdown;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> senec_exporter::Result<()> {
//!     let config = ExporterConfig::parse();
//!     let shutdown = Shutdown::new();
//!     senec_exporter::server::run(config, &shutdown).await
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod request;
pub mod response;
pub mod scraper;
pub mod server;
pub mod shutdown;

pub use config::ExporterConfig;
pub use error::{Error, FormatError, Result, StartupError, TransportError};
pub use metrics::{Gauge, GaugeRegistry, MetricsSink};
pub use protocol::{Appliance, HttpClient, HttpConfig};
pub use request::ReadRequest;
pub use response::ReadResponse;
pub use scraper::{CycleReport, Scheduler, SchedulerState, Scraper};
pub use shutdown::Shutdown;
