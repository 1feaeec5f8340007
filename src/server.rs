// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metrics endpoint and exporter wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;

use crate::config::ExporterConfig;
use crate::error::{Error, StartupError};
use crate::metrics::{CONTENT_TYPE, GaugeRegistry};
use crate::scraper::{Scheduler, Scraper};
use crate::shutdown::{Shutdown, ShutdownListener};

/// Path of the scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// Builds the router serving `registry`.
pub fn router(registry: Arc<GaugeRegistry>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics))
        .with_state(registry)
}

async fn metrics(State(registry): State<Arc<GaugeRegistry>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], registry.render())
}

/// Binds the metrics listener.
///
/// # Errors
///
/// Returns `StartupError::Bind` if the address is unavailable.
pub async fn bind(address: SocketAddr) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Serves `registry` on `listener` until `shutdown` resolves.
///
/// The listener is closed when this returns.
///
/// # Errors
///
/// Returns the underlying I/O error if serving fails.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<GaugeRegistry>,
    mut shutdown: ShutdownListener,
) -> std::io::Result<()> {
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Runs the exporter until `shutdown` is triggered.
///
/// Polling and serving run side by side on the current task. If serving
/// fails, shutdown is triggered so polling stops as well.
///
/// # Errors
///
/// Returns `Error::Startup` if the configuration is invalid or the listener
/// cannot be bound, and `Error::Io` if serving fails later on.
pub async fn run(config: ExporterConfig, shutdown: &Shutdown) -> Result<(), Error> {
    config.validate()?;
    tracing::debug!(?config, "Configuration");

    let client = config
        .http_config()
        .into_client()
        .map_err(StartupError::Client)?;

    let address = config.listen_addr();
    let listener = bind(address).await?;
    tracing::info!(
        address = %address,
        path = METRICS_PATH,
        appliance = client.read_url(),
        "Listening"
    );

    let registry = Arc::new(GaugeRegistry::new());
    let scraper = Scraper::new(client, Arc::clone(&registry)).with_wallbox(config.wallbox);
    let scheduler = Scheduler::new(scraper, config.interval());

    let serving = async {
        let result = serve(listener, registry, shutdown.listener()).await;
        shutdown.trigger();
        result
    };

    let (summary, served) = tokio::join!(scheduler.run(shutdown.listener()), serving);
    served?;

    tracing::debug!(cycles = summary.cycles, "Exporter stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::{Gauge, MetricsSink};

    #[tokio::test]
    async fn metrics_route_renders_registry() {
        let registry = Arc::new(GaugeRegistry::new());
        registry.set_gauge(Gauge::SolarPower, 1500.0);

        let response = router(Arc::clone(&registry))
            .oneshot(Request::get(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            CONTENT_TYPE
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("senec_solar_power 1500\n"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = router(Arc::new(GaugeRegistry::new()))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bind_conflict_is_startup_error() {
        let first = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();

        let err = bind(taken).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
