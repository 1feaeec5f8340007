// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exporter configuration.
//!
//! Every option can be given on the command line or through a `SENEC_*`
//! environment variable.
//!
//! # Examples
//!
//! ```
//! use clap::Parser;
//! use senec_exporter::config::ExporterConfig;
//!
//! let config = ExporterConfig::try_parse_from([
//!     "senec_exporter",
//!     "--host",
//!     "192.168.178.50",
//!     "--wallbox",
//! ])
//! .unwrap();
//!
//! assert_eq!(config.port, 9898);
//! assert_eq!(config.interval_millis(), 60_000);
//! assert!(config.wallbox);
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::error::StartupError;
use crate::protocol::HttpConfig;

/// Default port of the metrics endpoint.
pub const DEFAULT_PORT: u16 = 9898;

/// Default polling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Prometheus exporter for SENEC home energy storage appliances.
#[derive(Debug, Clone, Parser)]
#[command(name = "senec_exporter", author, version, about, long_about = None)]
pub struct ExporterConfig {
    /// Hostname or IP address of the appliance.
    #[arg(long, env = "SENEC_HOST")]
    pub host: String,

    /// Port the metrics endpoint listens on.
    #[arg(short, long, env = "SENEC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Polling interval in seconds.
    #[arg(short, long, env = "SENEC_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Also read the wallbox.
    #[arg(short, long, env = "SENEC_WALLBOX")]
    pub wallbox: bool,

    /// Log the configuration and every decoded value.
    #[arg(short, long, env = "SENEC_DEBUG")]
    pub debug: bool,

    /// Address the metrics endpoint binds to.
    #[arg(long, env = "SENEC_LISTEN", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub listen: IpAddr,

    /// Talk to the appliance over HTTPS.
    #[arg(long, env = "SENEC_HTTPS")]
    pub https: bool,

    /// Appliance request timeout in seconds (none by default).
    #[arg(long, env = "SENEC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long, env = "SENEC_LOG_JSON")]
    pub log_json: bool,
}

impl ExporterConfig {
    /// Checks the values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::InvalidConfig` for an empty host or a zero
    /// interval or timeout.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.host.trim().is_empty() {
            return Err(StartupError::InvalidConfig("host must not be empty".into()));
        }
        if self.interval == 0 {
            return Err(StartupError::InvalidConfig(
                "interval must be at least one second".into(),
            ));
        }
        if self.timeout == Some(0) {
            return Err(StartupError::InvalidConfig(
                "timeout must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// Returns the polling interval in milliseconds.
    #[must_use]
    pub fn interval_millis(&self) -> u64 {
        self.interval.saturating_mul(1000)
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis())
    }

    /// Returns the address the metrics endpoint binds to.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    /// Returns the appliance connection settings.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        let mut config = HttpConfig::new(self.host.trim());
        if self.https {
            config = config.with_https();
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}
