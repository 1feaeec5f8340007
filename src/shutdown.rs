// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cooperative shutdown.
//!
//! A [`Shutdown`] is triggered once, typically by [`wait_for_signal`], and
//! observed by any number of [`ShutdownListener`]s: the scheduler stops
//! ticking and the serving endpoint stops accepting connections.
//!
//! # Examples
//!
//! ```
//! use senec_exporter::shutdown::Shutdown;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let shutdown = Shutdown::new();
//! let mut listener = shutdown.listener();
//!
//! shutdown.trigger();
//! listener.wait().await;
//! assert!(shutdown.is_triggered());
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Handle used to request shutdown.
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Creates a handle that has not been triggered yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests shutdown. Calling this more than once has no further effect.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Returns whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates a listener that resolves once shutdown is requested.
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for a [`Shutdown`] to be triggered.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolves once shutdown is requested, immediately if it already was.
    ///
    /// Also resolves if every [`Shutdown`] handle has been dropped.
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|triggered| *triggered).await;
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
///
/// If a handler cannot be installed the error is logged and that source is
/// ignored.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::debug!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::debug!("Received SIGTERM, shutting down");
        }
    }
}
