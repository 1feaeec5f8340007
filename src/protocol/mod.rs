// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport to the appliance.
//!
//! The [`Appliance`] trait is the seam between the scraper and the network:
//! [`HttpClient`] talks to a real appliance, tests substitute scripted
//! doubles.

mod http;

pub use http::{HttpClient, HttpConfig};

use crate::error::TransportError;
use crate::request::ReadRequest;
use crate::response::ReadResponse;

/// Path of the appliance's JSON read endpoint.
pub const READ_PATH: &str = "/lala.cgi";

/// Something that can answer read requests.
#[allow(async_fn_in_trait)]
pub trait Appliance {
    /// Sends `request` and returns the validated response.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails or the response is not a
    /// well-formed read response.
    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse, TransportError>;
}

impl<A: Appliance + ?Sized> Appliance for &A {
    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse, TransportError> {
        (**self).read(request).await
    }
}
