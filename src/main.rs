// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line entry point for the SENEC exporter.

use anyhow::{Context, Result};
use clap::Parser;
use senec_exporter::config::ExporterConfig;
use senec_exporter::server;
use senec_exporter::shutdown::{self, Shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = ExporterConfig::parse();
    init_tracing(&config);

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        trigger.trigger();
    });

    server::run(config, &shutdown)
        .await
        .context("exporter failed")
}

fn init_tracing(config: &ExporterConfig) {
    let default_level = if config.debug { "debug" } else { "info" };

    // RUST_LOG takes precedence over --debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("senec_exporter={default_level}")).add_directive(
            tracing::Level::WARN.into(),
        )
    });

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}
