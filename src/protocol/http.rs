// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the appliance's `/lala.cgi` endpoint.

use std::time::Duration;

use reqwest::Client;

use crate::error::TransportError;
use crate::protocol::{Appliance, READ_PATH};
use crate::request::ReadRequest;
use crate::response::ReadResponse;

// ============================================================================
// HttpConfig - Connection parameters for the appliance
// ============================================================================

/// Configuration for reaching the appliance over HTTP.
///
/// No request timeout is set unless one is given explicitly; a hung
/// appliance then stalls only the poll cycle it belongs to.
///
/// # Examples
///
/// ```
/// use senec_exporter::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.178.50");
/// assert_eq!(config.read_url(), "http://192.168.178.50/lala.cgi");
///
/// let config = HttpConfig::new("senec.local")
///     .with_https()
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.read_url(), "https://senec.local/lala.cgi");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: Option<u16>,
    use_https: bool,
    timeout: Option<Duration>,
}

impl HttpConfig {
    /// Creates a configuration for `host`.
    ///
    /// `host` may be a bare hostname, `host:port`, or a full
    /// `http://`/`https://` base URL.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            use_https: false,
            timeout: None,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables HTTPS.
    ///
    /// Newer appliance firmware only serves HTTPS, with a self-signed
    /// certificate that is accepted as-is.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        self
    }

    /// Sets an explicit request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the explicit port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the explicit timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return host.to_string();
        }

        let scheme = if self.use_https { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        }
    }

    /// Returns the full URL of the read endpoint.
    #[must_use]
    pub fn read_url(&self) -> String {
        format!("{}{READ_PATH}", self.base_url())
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or the HTTP client cannot be
    /// created.
    pub fn into_client(self) -> Result<HttpClient, TransportError> {
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidAddress(
                "host is required".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.use_https || self.host.starts_with("https://") {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;

        Ok(HttpClient {
            read_url: self.read_url(),
            client,
        })
    }
}

// ============================================================================
// HttpClient - Sends read requests
// ============================================================================

/// HTTP client for the appliance.
///
/// # Examples
///
/// ```no_run
/// use senec_exporter::protocol::{Appliance, HttpConfig};
/// use senec_exporter::request::ReadRequest;
///
/// # async fn example() -> senec_exporter::Result<()> {
/// let client = HttpConfig::new("192.168.178.50").into_client()?;
/// let response = client.read(&ReadRequest::new()).await?;
/// println!("{:?}", response.energy());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    read_url: String,
    client: Client,
}

impl HttpClient {
    /// Returns the URL read requests are posted to.
    #[must_use]
    pub fn read_url(&self) -> &str {
        &self.read_url
    }
}

impl Appliance for HttpClient {
    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse, TransportError> {
        tracing::debug!(
            url = %self.read_url,
            wallbox = request.includes_wallbox(),
            "Sending read request"
        );

        let response = self.client.post(&self.read_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;

        tracing::debug!(body = %body, "Received read response");

        ReadResponse::from_json(&body)
    }
}
